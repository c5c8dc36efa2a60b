use anyhow::Result;
use rlsrl_core::{
    dummy::{DummyEnv, DummyEnvConfig},
    error::RlsrlError,
    session::DEVICE_ENV_VAR,
    BaseArgs, CallbackControl, Env, EnvRegistry, RlAlgorithm, Session, TrainConfig,
};
use rlsrl_deepq::{dummy::DummyBackend, DeepQ, DeepQArgs};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tempdir::TempDir;

// Runs in its own process: the session is initialized once per process.
#[test]
fn test_train_with_invalid_device() -> Result<()> {
    let dir = TempDir::new("deepq_session")?;
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();
    let mut envs = EnvRegistry::new();
    envs.register("Dummy-v0", move |spec| {
        let config = DummyEnvConfig::from_kwargs(&spec.kwargs)?.closed_flag(flag.clone());
        Ok(Box::new(DummyEnv::new(config, spec.seed)) as Box<dyn Env>)
    });
    let config = TrainConfig::new(
        BaseArgs {
            env: "Dummy-v0".to_string(),
            log_dir: dir.path().to_path_buf(),
            num_timesteps: 10,
            srl_model: "ground_truth".to_string(),
            ..Default::default()
        },
        DeepQArgs::default(),
    );

    std::env::set_var(DEVICE_ENV_VAR, "tpu");
    let mut agent = DeepQ::<DummyBackend>::new();
    let err = agent
        .train(&config, &envs, &mut |_| CallbackControl::Continue, None)
        .err()
        .unwrap();

    assert!(matches!(
        err.downcast_ref::<RlsrlError>(),
        Some(RlsrlError::SessionInitError(msg)) if msg.contains("tpu")
    ));
    assert!(closed.load(Ordering::SeqCst));
    assert!(!agent.is_ready());
    assert!(Session::get().is_none());
    assert!(!dir.path().join("args.yaml").exists());
    Ok(())
}
