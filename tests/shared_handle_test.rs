//! Concurrent use of one session through `SharedDeviceParameters`.

mod common;

use common::MockDevice;
use param_transfer::{DeviceParameters, ParamError, SharedDeviceParameters};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_share_one_session() {
    let server = MockDevice::stereo_camera().spawn();
    let shared = SharedDeviceParameters::new(DeviceParameters::from_transfer(server.connect()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let handle = shared.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                handle.read::<f64>("manual_gain").await.map(|_| ())
            } else {
                handle.write("trigger_0_enabled", i % 4 == 1).await
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Exactly one enumeration despite concurrent first use
    assert_eq!(server.enumerations(), 1);
    assert_eq!(server.frames().len(), 9);

    drop(shared);
    server.join();
}

#[tokio::test]
async fn closures_run_with_exclusive_access() {
    let server = MockDevice::stereo_camera().spawn();
    let shared = SharedDeviceParameters::new(DeviceParameters::from_transfer(server.connect()));

    let catalog = shared.parameters().await.unwrap();
    assert!(catalog.contains("manual_gain"));

    let gain = shared
        .with(|device| {
            device.set_manual_gain(6.0)?;
            device.manual_gain()
        })
        .await
        .unwrap();
    assert_eq!(gain, 6.0);

    let err = shared.value("no_such_parameter").await.unwrap_err();
    assert!(matches!(err, ParamError::UnknownParameterName(_)));

    drop(shared);
    server.join();
}
