//! buckets command - List buckets
//!
//! Lists every bucket visible to the active credential together with the
//! region it lives in.

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::BucketView;

/// Execute the buckets command
pub async fn execute(session: &Session) -> ExitCode {
    let browser = session.browser().await;

    match browser.list_buckets().await {
        Ok(buckets) => {
            session.formatter.output(&BucketView { buckets });
            ExitCode::Success
        }
        Err(e) => session.fail(&e),
    }
}
