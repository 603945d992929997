//! Kept apart in its own test binary: it writes the real process environment.

use std::{
    convert::Infallible,
    env,
    sync::{Mutex, MutexGuard, mpsc},
    thread,
};

use specs::{Backend, MasterEndpoint, RendezvousConfig};
use worker::{DispatchError, ProcessEnv, ProcessGroupRuntime, RuntimeError, dispatch_with_ddp};

/// The tests below all claim the process environment, they must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct CountingRuntime {
    init: usize,
    destroy: usize,
}

impl ProcessGroupRuntime for CountingRuntime {
    fn init_process_group(
        &mut self,
        _backend: &Backend,
        _config: &RendezvousConfig,
    ) -> Result<(), RuntimeError> {
        self.init += 1;
        Ok(())
    }

    fn destroy_process_group(&mut self) -> Result<(), RuntimeError> {
        self.destroy += 1;
        Ok(())
    }
}

fn config(rank: usize, world_size: usize) -> RendezvousConfig {
    RendezvousConfig::new(MasterEndpoint::new("master_addr", 2343), rank, world_size)
}

#[test]
fn dispatch_writes_process_environment() {
    let _serial = serial();
    let mut runtime = CountingRuntime::default();

    let rank = dispatch_with_ddp(
        &mut runtime,
        |_, ()| Ok::<_, Infallible>(env::var("RANK")),
        &config(1, 10),
        (),
    )
    .unwrap();

    assert_eq!(rank.as_deref(), Ok("1"));
    assert_eq!(env::var("MASTER_ADDR").as_deref(), Ok("master_addr"));
    assert_eq!(env::var("MASTER_PORT").as_deref(), Ok("2343"));
    assert_eq!(env::var("WORLD_SIZE").as_deref(), Ok("10"));
    assert_eq!((runtime.init, runtime.destroy), (1, 1));
    assert!(!ProcessEnv::is_claimed());
}

#[test]
fn overlapping_dispatch_from_another_thread_is_refused() {
    let _serial = serial();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let first = thread::spawn(move || {
        let mut runtime = CountingRuntime::default();
        dispatch_with_ddp(
            &mut runtime,
            |_, ()| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok::<_, Infallible>(env::var("RANK"))
            },
            &config(0, 2),
            (),
        )
    });
    entered_rx.recv().unwrap();

    let mut runtime = CountingRuntime::default();
    let second = dispatch_with_ddp(
        &mut runtime,
        |_, ()| Ok::<_, Infallible>(()),
        &config(1, 2),
        (),
    );

    assert!(matches!(second, Err(DispatchError::EnvironmentBusy(_))));
    assert_eq!((runtime.init, runtime.destroy), (0, 0));

    release_tx.send(()).unwrap();
    let rank = first.join().unwrap().unwrap();
    assert_eq!(rank.as_deref(), Ok("0"));
}

#[test]
fn environment_is_released_after_each_dispatch() {
    let _serial = serial();
    let mut runtime = CountingRuntime::default();

    let failed = dispatch_with_ddp(
        &mut runtime,
        |_, ()| Err::<(), _>(std::fmt::Error),
        &config(0, 2),
        (),
    );
    assert!(matches!(failed, Err(DispatchError::Training(_))));
    assert!(!ProcessEnv::is_claimed());

    let rank = dispatch_with_ddp(
        &mut runtime,
        |_, ()| Ok::<_, Infallible>(env::var("RANK")),
        &config(1, 2),
        (),
    )
    .unwrap();

    assert_eq!(rank.as_deref(), Ok("1"));
    assert_eq!((runtime.init, runtime.destroy), (2, 2));
}
