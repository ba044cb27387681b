// Integration tests for the storage sinks

use anyhow::Result;
use podcast_tts::config::{StorageConfig, StorageKind};
use podcast_tts::storage::{LocalStorage, S3Storage, StorageSink};
use podcast_tts::PodcastError;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[tokio::test]
async fn test_local_put_writes_nested_object() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path());

    let url = storage
        .put("podcast/in-1/task-1/audio.mp3", vec![1, 2, 3], "audio/mpeg")
        .await?;

    let path = temp_dir.path().join("podcast/in-1/task-1/audio.mp3");
    assert_eq!(fs::read(&path)?, vec![1, 2, 3]);
    assert!(url.starts_with("file://"), "unexpected url: {}", url);
    assert!(url.ends_with("podcast/in-1/task-1/audio.mp3"));
    Ok(())
}

#[tokio::test]
async fn test_local_put_overwrites() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path());

    storage.put("a/subtitles.srt", b"old".to_vec(), "text/srt").await?;
    storage.put("a/subtitles.srt", b"new".to_vec(), "text/srt").await?;

    assert_eq!(fs::read_to_string(temp_dir.path().join("a/subtitles.srt"))?, "new");
    Ok(())
}

#[tokio::test]
async fn test_local_put_rejects_escaping_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path().join("root"));

    for key in ["../outside.mp3", "/etc/passwd", ""] {
        let result = storage.put(key, vec![0], "audio/mpeg").await;
        assert!(
            matches!(result, Err(PodcastError::Upload { .. })),
            "key {:?} should be rejected",
            key
        );
    }
    assert!(!temp_dir.path().join("outside.mp3").exists());
    Ok(())
}

#[tokio::test]
async fn test_s3_upload_gives_up_on_silent_endpoint() -> Result<()> {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let storage = S3Storage::new(&StorageConfig {
        kind: StorageKind::S3,
        endpoint: format!("http://{}", addr),
        timeout_secs: 1,
        ..StorageConfig::default()
    })?;

    let started = Instant::now();
    let result = storage
        .put("podcast/in-1/task-1/round_0.mp3", vec![1, 2, 3], "audio/mpeg")
        .await;

    match result {
        Err(PodcastError::Upload { key, message }) => {
            assert_eq!(key, "podcast/in-1/task-1/round_0.mp3");
            assert!(message.contains("timed out"), "unexpected message: {}", message);
        }
        other => panic!("expected upload timeout, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(10));

    server.abort();
    Ok(())
}
