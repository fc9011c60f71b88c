//! Destination writer: fan a finished file out to every output directory

use std::path::PathBuf;

use anyhow::Result;
use futures::future::join_all;
use log::trace;

use crate::host::FileSystem;

/// Write `code` as `file_name` into each destination concurrently
///
/// Every write runs to completion, even when a sibling fails. The first
/// failure is then returned as-is; writes that landed are left in place.
pub async fn write_all(
    fs: &dyn FileSystem,
    code: &str,
    file_name: &str,
    destinations: &[PathBuf],
) -> Result<()> {
    let writes = destinations.iter().map(|dst| {
        let path = dst.join(file_name);
        async move {
            trace!("Writing {}", path.display());
            fs.write_file(&path, code).await
        }
    });

    join_all(writes).await.into_iter().collect()
}
