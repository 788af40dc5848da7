use anyhow::Result;
use tormon_torrent_core::{
    AddTorrent, Alert, TorrentEngine, TorrentError, TorrentHandle, TorrentSource, TorrentState,
};
use tormon_torrent_sim::{SessionSettings, SimulatedEngine, SimulationProfile};

fn engine() -> SimulatedEngine {
    SimulatedEngine::new(
        SessionSettings::default(),
        SimulationProfile {
            metadata_delay: 2,
            ..SimulationProfile::default()
        },
    )
}

fn magnet(byte: &str, name: &str) -> Result<AddTorrent> {
    let uri = format!(
        "magnet:?xt=urn:btih:{}&dn={name}&xl=1048576&tr=http%3A%2F%2Ft.example%2Fannounce",
        byte.repeat(20)
    );
    Ok(AddTorrent::new(TorrentSource::from_descriptor(&uri)?, "./output/"))
}

async fn added_handle(engine: &SimulatedEngine) -> Option<TorrentHandle> {
    engine.pop_alerts().await.into_iter().find_map(|alert| match alert {
        Alert::TorrentAdded { handle, .. } => Some(handle),
        _ => None,
    })
}

#[tokio::test]
async fn added_torrent_is_announced_by_alert() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("aa", "first")?).await?;

    let alerts = engine.pop_alerts().await;
    assert_eq!(alerts.len(), 1);
    match &alerts[0] {
        Alert::TorrentAdded { status, .. } => {
            assert_eq!(status.name, "first");
            assert_eq!(status.state, TorrentState::DownloadingMetadata);
            assert!(!status.has_metadata);
        }
        other => panic!("unexpected alert {other:?}"),
    }
    assert!(engine.pop_alerts().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_info_hash_is_rejected() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("bb", "one")?).await?;
    let err = engine.add_torrent(magnet("bb", "two")?).await.unwrap_err();
    assert!(matches!(err, TorrentError::Duplicate { .. }));
    Ok(())
}

#[tokio::test]
async fn updates_are_batched_per_refresh() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("cc", "a")?).await?;
    engine.add_torrent(magnet("dd", "b")?).await?;
    engine.pop_alerts().await;

    engine.post_torrent_updates().await;
    let batches: Vec<usize> = engine
        .pop_alerts()
        .await
        .into_iter()
        .filter_map(|alert| match alert {
            Alert::StateUpdate { statuses } => Some(statuses.len()),
            _ => None,
        })
        .collect();
    assert_eq!(batches, vec![2]);
    Ok(())
}

#[tokio::test]
async fn resume_data_requires_metadata() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("ee", "slow")?).await?;
    let handle = added_handle(&engine).await.expect("torrent added");

    engine.save_resume_data(handle).await?;
    assert!(matches!(
        engine.pop_alerts().await.as_slice(),
        [Alert::ResumeDataSaveFailed { .. }]
    ));
    assert!(matches!(
        engine.file_progress(handle).await,
        Err(TorrentError::MetadataUnavailable { .. })
    ));

    engine.post_torrent_updates().await;
    engine.post_torrent_updates().await;
    engine.pop_alerts().await;
    engine.save_resume_data(handle).await?;
    let alerts = engine.pop_alerts().await;
    let payload = match alerts.as_slice() {
        [Alert::ResumeDataSaved { payload, .. }] => payload.clone(),
        other => panic!("unexpected alerts {other:?}"),
    };
    assert!(!payload.is_empty());
    assert_eq!(engine.file_progress(handle).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn injected_failure_reports_save_failed() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("ff", "doomed")?).await?;
    let handle = added_handle(&engine).await.expect("torrent added");
    engine.post_torrent_updates().await;
    engine.post_torrent_updates().await;
    engine.pop_alerts().await;

    engine.fail_resume_for(handle).await?;
    engine.save_resume_data(handle).await?;
    assert!(matches!(
        engine.pop_alerts().await.as_slice(),
        [Alert::ResumeDataSaveFailed { .. }]
    ));
    Ok(())
}

#[tokio::test]
async fn pause_session_pauses_every_torrent() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("12", "x")?).await?;
    let handle = added_handle(&engine).await.expect("torrent added");

    engine.pause_session().await;
    assert!(engine.is_session_paused().await);
    assert!(engine.status(handle).await?.paused);
    Ok(())
}

#[tokio::test]
async fn dropped_handle_becomes_invalid() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("34", "gone")?).await?;
    let handle = added_handle(&engine).await.expect("torrent added");

    assert!(engine.is_valid(handle).await);
    assert!(engine.drop_torrent(handle).await);
    assert!(!engine.is_valid(handle).await);
    assert!(matches!(
        engine.pause(handle).await,
        Err(TorrentError::InvalidHandle { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn saved_payload_restores_progress_in_a_new_session() -> Result<()> {
    let first = engine();
    first.add_torrent(magnet("56", "carry")?).await?;
    let handle = added_handle(&first).await.expect("torrent added");
    for _ in 0..3 {
        first.post_torrent_updates().await;
    }
    let done = first.status(handle).await?.total_done;
    assert!(done > 0);
    first.pop_alerts().await;
    first.save_resume_data(handle).await?;
    let payload = first
        .pop_alerts()
        .await
        .into_iter()
        .find_map(|alert| match alert {
            Alert::ResumeDataSaved { payload, .. } => Some(payload),
            _ => None,
        })
        .expect("payload saved");

    let second = engine();
    let mut request = magnet("56", "carry")?;
    request.resume_data = Some(payload);
    second.add_torrent(request).await?;
    let alerts = second.pop_alerts().await;
    match alerts.as_slice() {
        [Alert::TorrentAdded { status, .. }] => {
            assert_eq!(status.total_done, done);
            assert_eq!(status.state, TorrentState::CheckingResume);
        }
        other => panic!("unexpected alerts {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn connection_limits_are_recorded() -> Result<()> {
    let engine = engine();
    engine.add_torrent(magnet("78", "limits")?).await?;
    let handle = added_handle(&engine).await.expect("torrent added");
    engine.set_max_connections(handle, 60).await?;
    engine.set_max_uploads(handle, -1).await?;
    assert_eq!(engine.limits(handle).await?, (60, -1));
    Ok(())
}
