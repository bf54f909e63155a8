use futures::StreamExt;
use rowstitch::{Options, Result, partial_result_stream};
use std::time::Duration;

use crate::remote::Remote;

pub async fn main() -> Result<()> {
    let remote = Remote::new(1);
    let request = {
        let remote = remote.clone();
        move |token| remote.call(token)
    };

    let options = Options::from_env().backoff(Duration::from_millis(1), Duration::from_millis(64));
    let mut events = partial_result_stream(request, options).spawn(2);

    let mut count = 0;
    while let Some(event) = events.next().await {
        // slow consumer
        tokio::time::sleep(Duration::from_millis(10)).await;

        if let Some(row) = event?.into_row() {
            let id = row.try_get::<_, i64>("id")?;
            count += 1;
            assert_eq!(id, count);
        }
    }

    assert_eq!(count, 6);
    assert_eq!(remote.calls(), 2);

    Ok(())
}
