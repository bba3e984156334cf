// The robot.toml shipped with the crate must load and drive the simulator

use aracna_rs::sim::{spawn_simulated, SimFaults};
use aracna_rs::{load_config, RobotSession, RunOptions};
use std::path::Path;

#[test]
fn test_sample_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("robot.toml");
    let config = load_config(&path).unwrap();
    assert_eq!(config.robot.servo_count(), 8);
    assert_eq!(config.protocol.hello, "HE");
    assert_eq!(config.run.options.interp_begin, Some(2.0));
    let motion = config.motion.as_ref().unwrap();
    assert!(motion.looped);
    assert_eq!(motion.duration(), 1.5);
}

#[tokio::test(start_paused = true)]
async fn test_sample_motion_runs_on_simulator() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("robot.toml");
    let config = load_config(&path).unwrap();
    let motion = config.motion.as_ref().unwrap();
    let (stream, device) = spawn_simulated(&config, vec![512; 8], SimFaults::default());
    let mut session = RobotSession::new(stream, &config).unwrap();

    session.hello().await.unwrap();
    let options = RunOptions {
        run_seconds: 1.5,
        reset_first: false,
        interp_begin: None,
        interp_end: None,
        time_scale: 1.0,
    };
    let summary = session.run(motion.as_motion(), &options, None).await.unwrap();
    // 40 Hz for 1.5 s
    assert_eq!(summary.ticks, 60);

    drop(session);
    let report = device.await.unwrap().unwrap();
    assert_eq!(report.hellos, 1);
    assert_eq!(report.positions[0], vec![512, 300, 512, 300, 512, 300, 512, 300]);
    assert_eq!(report.positions[20], vec![600, 380, 512, 300, 600, 380, 512, 300]);
}
