use futures::StreamExt;
use rowstitch::{JsonOptions, Options, Result, partial_result_stream};

use crate::remote::Remote;

pub async fn main() -> Result<()> {
    let remote = Remote::new(2);

    // Collect

    let rows = partial_result_stream(|token| remote.call(token), Options::from_env())
        .fetch_all()
        .await?;

    assert_eq!(rows.len(), 6);
    assert_eq!(remote.calls(), 3);

    let (id, name, tags) = rows[2].clone().decode::<(i64, String, Vec<String>)>()?;
    assert_eq!(id, 3);
    assert_eq!(name, "Barbara");
    assert_eq!(tags, ["tag2", "common"]);

    // Stream

    let mut stream = partial_result_stream(|token| remote.call(token), Options::default()).rows();

    while let Some(row) = stream.next().await {
        let row = row?;
        let name = row.try_get::<_, String>("name")?;
        tracing::info!("{name}");
    }

    let stats = stream.inner_mut().stats().cloned();
    assert_eq!(stats.and_then(|s| s.row_count_exact), Some(6));

    // Json

    let mut stream = partial_result_stream(|token| remote.call(token), Options::default())
        .json(JsonOptions::default().wrap_numbers(true));

    while let Some(row) = stream.next().await {
        tracing::info!("{}", serde_json::Value::Object(row?));
    }

    Ok(())
}
