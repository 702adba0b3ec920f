use crate::error::Error;
use crate::models;
use crate::schema;
use crate::stored;
use crate::Conn;
use crate::handles;

use squash_types::data;

use diesel::prelude::*;

#[derive(Clone, Debug)]
pub struct Metric {
    pub metric: models::Metric,
}

impl Metric {
    /// Creates every metric of `decls`, or none of them.
    pub fn create(conn: &mut Conn, decls: &[data::Metric]) -> Result<Vec<handles::Metric>, Error> {
        conn.transaction::<Vec<handles::Metric>, Error, _>(|conn| {
            decls.iter().map(|decl| Self::create_one(conn, decl)).collect()
        })
    }

    fn create_one(conn: &mut Conn, decl: &data::Metric) -> Result<handles::Metric, Error> {
        let handle = handles::metric(decl.metric.clone());
        if !handle.legal() {
            return Err(Error::IllegalMetricHandle(handle));
        }
        if decl.description.trim().is_empty() {
            return Err(Error::InvalidMetric {
                metric: decl.metric.clone(),
                reason: "description may not be blank".into(),
            });
        }
        if decl.unit.chars().count() > 16 {
            return Err(Error::InvalidMetric {
                metric: decl.metric.clone(),
                reason: "unit is longer than 16 characters".into(),
            });
        }
        if decl.operator.is_empty() || decl.operator.chars().count() > 2 {
            return Err(Error::InvalidMetric {
                metric: decl.metric.clone(),
                reason: format!("bad operator {:?}", decl.operator),
            });
        }
        let existing = schema::metrics::table
            .find(&decl.metric)
            .select(schema::metrics::metric)
            .first::<String>(conn)
            .optional()?;
        if existing.is_some() {
            return Err(Error::MetricAlreadyExists(handle));
        }

        let parameters = stored::encode_plain(&decl.parameters)?;
        let specs = stored::encode_plain(&decl.specs)?;
        let reference = stored::encode_plain(&decl.reference)?;
        let new_metric = models::NewMetric {
            metric: &decl.metric,
            unit: &decl.unit,
            description: &decl.description,
            operator: &decl.operator,
            parameters: parameters.as_deref(),
            specs: specs.as_deref(),
            reference: reference.as_deref(),
        };
        diesel::insert_into(schema::metrics::table)
            .values(&new_metric)
            .execute(conn)?;
        tracing::debug!("created metric {}", handle);
        Ok(handle)
    }

    pub fn get(conn: &mut Conn, handle: &handles::Metric) -> Result<Self, Error> {
        let metric = schema::metrics::table
            .find(&handle.name)
            .first::<models::Metric>(conn)
            .optional()?
            .ok_or(Error::MetricNotFound(handle.clone()))?;
        Ok(Metric { metric })
    }

    pub fn info(&self) -> data::Metric {
        let m = &self.metric;
        data::Metric {
            metric: m.metric.clone(),
            unit: m.unit.clone(),
            description: m.description.clone(),
            operator: m.operator.clone(),
            parameters: stored::decode_plain("parameters", m.parameters.as_deref()),
            specs: stored::decode_plain("specs", m.specs.as_deref()),
            reference: stored::decode_plain("reference", m.reference.as_deref()),
        }
    }

    pub fn list(conn: &mut Conn) -> Result<Vec<data::Metric>, Error> {
        Ok(schema::metrics::table
            .order(schema::metrics::metric.asc())
            .load::<models::Metric>(conn)?
            .into_iter()
            .map(|metric| Metric { metric }.info())
            .collect())
    }
}
