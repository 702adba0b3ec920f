use crate::schema::jobs;
use crate::schema::measurements;
use crate::schema::metrics;
use crate::schema::packages;

use diesel::prelude::*;

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = jobs)]
pub struct Job {
    pub id: i32,
    pub ci_id: String,
    pub ci_name: String,
    pub ci_dataset: String,
    pub ci_label: String,
    pub date: i64,
    pub ci_url: String,
    pub status: i32,
    pub blobs: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob<'a> {
    pub ci_id: &'a str,
    pub ci_name: &'a str,
    pub ci_dataset: &'a str,
    pub ci_label: &'a str,
    pub date: i64,
    pub ci_url: &'a str,
    pub status: i32,
    pub blobs: Option<&'a str>,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = metrics, primary_key(metric))]
pub struct Metric {
    pub metric: String,
    pub unit: String,
    pub description: String,
    pub operator: String,
    pub parameters: Option<String>,
    pub specs: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = metrics)]
pub struct NewMetric<'a> {
    pub metric: &'a str,
    pub unit: &'a str,
    pub description: &'a str,
    pub operator: &'a str,
    pub parameters: Option<&'a str>,
    pub specs: Option<&'a str>,
    pub reference: Option<&'a str>,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = measurements)]
#[diesel(belongs_to(Job))]
pub struct Measurement {
    pub id: i32,
    pub value: f64,
    pub metadata: Option<String>,
    pub job_id: i32,
    pub metric_id: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = measurements)]
pub struct NewMeasurement<'a> {
    pub value: f64,
    pub metadata: Option<&'a str>,
    pub job_id: i32,
    pub metric_id: &'a str,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = packages)]
#[diesel(belongs_to(Job))]
pub struct Package {
    pub id: i32,
    pub name: String,
    pub git_url: String,
    pub git_commit: String,
    pub git_branch: String,
    pub build_version: String,
    pub job_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = packages)]
pub struct NewPackage<'a> {
    pub name: &'a str,
    pub git_url: &'a str,
    pub git_commit: &'a str,
    pub git_branch: &'a str,
    pub build_version: &'a str,
    pub job_id: i32,
}
