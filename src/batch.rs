use std::future::Future;

use crate::entities::MutationResponse;
use crate::error::Result;

/// Submits `items` in consecutive chunks of at most `size`, one request at a
/// time, and concatenates the outcomes in submission order.
///
/// A failing chunk aborts the remaining ones; chunks already accepted by the
/// server stay applied.
pub(crate) async fn in_chunks<'a, I, T, F, Fut>(
    items: &'a [I],
    size: usize,
    mut submit: F,
) -> Result<MutationResponse<T>>
where
    F: FnMut(&'a [I]) -> Fut,
    Fut: Future<Output = Result<MutationResponse<T>>>,
{
    let size = size.max(1);
    let total = items.len().div_ceil(size);
    let mut merged = MutationResponse::empty();

    for (index, chunk) in items.chunks(size).enumerate() {
        if total > 1 {
            debug!(chunk = index + 1, total, len = chunk.len(), "submitting batch chunk");
        }
        merged.extend(submit(chunk).await?);
    }

    Ok(merged)
}
