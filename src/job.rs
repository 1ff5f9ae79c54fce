use tracing::{debug, info, warn};

use crate::cfg::SheetsConfig;
use crate::error::Error;
use crate::publisher::{PostId, Publisher};
use crate::sheets::SheetSource;
use crate::status;

/// Records that a range has been posted.
pub trait CompletionMarker {
    fn mark_complete(&self) -> Result<(), Error>;
}

// TODO: persist the last posted range so repeated runs skip identical content.
#[derive(Debug, Default)]
pub struct NoopMarker;

impl CompletionMarker for NoopMarker {
    fn mark_complete(&self) -> Result<(), Error> {
        debug!("Nothing to mark complete");
        Ok(())
    }
}

/// One pass: read the range, format it, post it, mark it complete. The first
/// failing step ends the run.
pub async fn run_job(
    sheets: &SheetsConfig,
    source: &dyn SheetSource,
    publisher: &dyn Publisher,
    marker: &dyn CompletionMarker,
) -> Result<PostId, Error> {
    info!("Starting job execution");

    let range = sheets.range();
    let grid = source.read_range(&sheets.id, &range).await?;
    if grid.is_empty() {
        return Err(Error::EmptyResult);
    }
    info!("Found {} rows in {}", grid.len(), range);

    let message = status::format(&grid);
    debug!("Formatted status: {}", message);

    let post_id = publisher.post(&message).await?;

    marker.mark_complete()?;

    info!("Job completed successfully");
    Ok(post_id)
}

pub async fn run_with_error_handling(
    sheets: &SheetsConfig,
    source: &dyn SheetSource,
    publisher: &dyn Publisher,
    marker: &dyn CompletionMarker,
) -> Result<PostId, Error> {
    match run_job(sheets, source, publisher, marker).await {
        Ok(post_id) => Ok(post_id),
        Err(e) => {
            warn!("Job failed with error: {}", e);
            Err(e)
        }
    }
}
