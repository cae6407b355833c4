use std::time::Duration;

use anyhow::Result;
use blobseer_storage::{CachedDht, Dht, DhtError, MeasuredDht, MemoryDht, PutOptions};

#[tokio::test]
async fn it_guards_replaced_records_with_their_secret() -> Result<()> {
    let dht = Dht::new(MemoryDht::default());
    let owner = PutOptions::default();
    let intruder = PutOptions {
        secret: "somebody else".into(),
        ..PutOptions::default()
    };

    dht.overwrite(&"providers", &vec!["a".to_string()], &owner)
        .await?;
    dht.overwrite(&"providers", &vec!["b".to_string()], &owner)
        .await?;

    assert!(matches!(
        dht.overwrite(&"providers", &vec!["c".to_string()], &intruder)
            .await,
        Err(DhtError::SecretMismatch(_))
    ));
    assert_eq!(
        dht.read::<_, Vec<String>>(&"providers").await?,
        Some(vec!["b".to_string()])
    );

    Ok(())
}

#[tokio::test]
async fn it_stacks_a_cache_over_a_measured_backend() -> Result<()> {
    let measured = MeasuredDht::new(MemoryDht::default());
    let dht = Dht::new(CachedDht::new(measured.clone(), 16)?);
    let options = PutOptions {
        ttl: Duration::ZERO,
        ..PutOptions::default()
    };

    let records: Vec<(u64, String)> = (0..4).map(|i| (i, format!("node {i}"))).collect();
    dht.write_many(&records, &options).await?;
    assert_eq!(measured.puts(), 4);

    // Writing an identical record again is accepted
    dht.write(&2u64, &"node 2".to_string(), &options).await?;
    assert!(matches!(
        dht.write(&2u64, &"changed".to_string(), &options).await,
        Err(DhtError::Conflict(_))
    ));

    let values: Vec<Option<String>> = dht.read_many(&[3u64, 9, 0]).await?;
    assert_eq!(
        values,
        vec![Some("node 3".to_string()), None, Some("node 0".to_string())]
    );
    // Only the miss reached the backend
    assert_eq!(measured.gets(), 1);

    Ok(())
}
