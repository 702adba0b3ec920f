use crate::error::Error;
use crate::responses::AppData;
use crate::schema;
use crate::stored;
use crate::Conn;

use squash_types::data::{Blob, MetadataBlobs};

use diesel::prelude::*;
use serde_json::{Map, Value};

/// Data for the dashboard apps: the metadata of the `metric` measurement of
/// a job, and the job blobs that metadata refers to.
pub fn resolve_app_data(
    conn: &mut Conn,
    ci_id: &str,
    ci_dataset: &str,
    metric: &str,
) -> Result<AppData, Error> {
    use schema::{jobs, measurements};

    let blobs = jobs::table
        .filter(jobs::ci_id.eq(ci_id))
        .filter(jobs::ci_dataset.eq(ci_dataset))
        .order(jobs::id.asc())
        .select(jobs::blobs)
        .first::<Option<String>>(conn)
        .optional()?
        .flatten();
    let metadata = measurements::table
        .inner_join(jobs::table)
        .filter(measurements::metric_id.eq(metric))
        .filter(jobs::ci_id.eq(ci_id))
        .filter(jobs::ci_dataset.eq(ci_dataset))
        .order(measurements::id.asc())
        .select(measurements::metadata)
        .first::<Option<String>>(conn)
        .optional()?
        .flatten();

    Ok(assemble(blobs.as_deref(), metadata.as_deref()))
}

/// Cross-references stored metadata and blobs. Anything missing or malformed
/// only leaves the corresponding keys out.
pub fn assemble(blobs: Option<&str>, metadata: Option<&str>) -> AppData {
    let mut data = AppData::default();

    let Some(mut metadata) = stored::decode_column::<Map<String, Value>>("metadata", metadata)
    else {
        return data;
    };
    let roles = metadata
        .remove("blobs")
        .and_then(|roles| match serde_json::from_value::<MetadataBlobs>(roles) {
            Ok(roles) => Some(roles),
            Err(e) => {
                tracing::warn!("malformed blob references in metadata: {}", e);
                None
            }
        });
    data.metadata = Some(Value::Object(metadata));

    let (Some(roles), Some(blobs)) = (roles, stored::decode_column::<Vec<Blob>>("blobs", blobs))
    else {
        return data;
    };
    let lookup = |identifier: &Option<String>| {
        let identifier = identifier.as_ref()?;
        blobs
            .iter()
            .find(|blob| &blob.identifier == identifier)
            .map(|blob| blob.data.clone())
    };
    data.matched_dataset = lookup(&roles.matched_dataset);
    data.photom_model = lookup(&roles.photom_model);
    data.astrom_model = lookup(&roles.astrom_model);
    data
}
