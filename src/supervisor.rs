//! Restarts sessions that halt on a fatal error.
//!
//! A session's halt callback only records the reason; the supervisor reads
//! it once the session's event loop returns, stops the session, and decides
//! whether a fresh one follows.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use tokio::time::sleep;

use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::console::Output;
use crate::prompt::LineInput;
use crate::session::Session;

/// Why [`run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The shutdown signal fired.
    Interrupted,
    /// A session halted and no restart followed.
    Fatal(String),
}

impl SupervisorExit {
    /// Whether the process should exit successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, SupervisorExit::Interrupted)
    }
}

/// Runs sessions until `shutdown` completes or a fatal error ends the loop.
///
/// `make_output` is called for every new session and for the restart
/// notice. No restart happens when `supervisor.restart_on_fatal` is off or
/// when `input` has reached end-of-input.
pub async fn run<F>(
    config: &Config,
    input: LineInput,
    mut make_output: F,
    shutdown: impl Future<Output = ()>,
) -> Result<SupervisorExit, ConfigError>
where
    F: FnMut() -> Box<dyn Output>,
{
    config.validate()?;
    let restart_delay = config.supervisor.restart_delay()?;
    tokio::pin!(shutdown);

    loop {
        let halt_reason: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&halt_reason);
        let mut session = Session::connect(config, input.clone(), make_output(), move |reason| {
            *slot.borrow_mut() = Some(reason);
        })?;

        let interrupted = tokio::select! {
            _ = session.run() => false,
            _ = &mut shutdown => true,
        };
        session.stop();
        drop(session);

        if interrupted {
            tracing::info!("Shutdown requested");
            return Ok(SupervisorExit::Interrupted);
        }

        let reason = halt_reason
            .borrow_mut()
            .take()
            .unwrap_or_else(|| "all event sources closed".to_string());

        if input.is_closed() {
            tracing::info!("Input ended, not restarting: {}", reason);
            return Ok(SupervisorExit::Fatal(reason));
        }
        if !config.supervisor.restart_on_fatal {
            return Ok(SupervisorExit::Fatal(reason));
        }

        make_output().error(&format!("Restarting due to fatal error: {}", reason));
        tokio::select! {
            _ = sleep(restart_delay) => {}
            _ = &mut shutdown => return Ok(SupervisorExit::Interrupted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResultPage;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Recorder {
        fn factory(&self) -> impl FnMut() -> Box<dyn Output> {
            let lines = Rc::clone(&self.0);
            move || Box::new(Recorder(Rc::clone(&lines)))
        }

        fn lines(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    impl Output for Recorder {
        fn info(&mut self, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }

        fn error(&mut self, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }

        fn result(&mut self, page: &ResultPage) {
            self.0.borrow_mut().push(page.to_string());
        }
    }

    async fn unused_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        addr.to_string()
    }

    fn config_for(address: String, restart_on_fatal: bool) -> Config {
        let mut config = Config::default();
        config.server.address = address;
        config.reconnect.initial_delay = "10ms".to_string();
        config.reconnect.max_delay = "20ms".to_string();
        config.reconnect.max_attempts = 1;
        config.supervisor.restart_on_fatal = restart_on_fatal;
        config.supervisor.restart_delay = "10ms".to_string();
        config
    }

    fn idle_input() -> (mpsc::UnboundedSender<std::io::Result<String>>, LineInput) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, LineInput::from_channel(rx))
    }

    #[tokio::test]
    async fn fatal_error_without_restart_exits() {
        let config = config_for(unused_address().await, false);
        let (_lines, input) = idle_input();
        let recorder = Recorder::default();

        let exit = timeout(
            WAIT,
            run(&config, input, recorder.factory(), std::future::pending()),
        )
        .await
        .expect("supervisor should return")
        .expect("config is valid");

        match exit {
            SupervisorExit::Fatal(reason) => assert!(reason.starts_with("Connection error: ")),
            other => panic!("expected Fatal, got {other:?}"),
        }
        assert!(!recorder
            .lines()
            .iter()
            .any(|l| l.starts_with("Restarting due to fatal error")));
    }

    #[tokio::test]
    async fn fatal_error_restarts_until_shutdown() {
        let config = config_for(unused_address().await, true);
        let (_lines, input) = idle_input();
        let recorder = Recorder::default();

        let exit = timeout(
            WAIT,
            run(
                &config,
                input,
                recorder.factory(),
                sleep(Duration::from_millis(300)),
            ),
        )
        .await
        .expect("supervisor should return")
        .expect("config is valid");

        assert_eq!(exit, SupervisorExit::Interrupted);
        assert!(exit.is_success());
        let restarts = recorder
            .lines()
            .iter()
            .filter(|l| l.starts_with("Restarting due to fatal error: Connection error: "))
            .count();
        assert!(restarts >= 1, "expected at least one restart");
    }

    #[tokio::test]
    async fn end_of_input_is_not_restarted() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let config = config_for(
            listener.local_addr().expect("local addr").to_string(),
            true,
        );
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let (lines, input) = idle_input();
        drop(lines);
        let recorder = Recorder::default();

        let exit = timeout(
            WAIT,
            run(&config, input, recorder.factory(), std::future::pending()),
        )
        .await
        .expect("supervisor should return")
        .expect("config is valid");

        assert_eq!(
            exit,
            SupervisorExit::Fatal("Input error: input stream closed".to_string())
        );
        assert!(!exit.is_success());
        assert!(!recorder
            .lines()
            .iter()
            .any(|l| l.starts_with("Restarting")));
    }

    #[tokio::test]
    async fn shutdown_interrupts_running_session() {
        let mut config = config_for(unused_address().await, true);
        config.reconnect.max_attempts = 0;
        let (_lines, input) = idle_input();
        let recorder = Recorder::default();

        let exit = timeout(
            WAIT,
            run(&config, input, recorder.factory(), std::future::ready(())),
        )
        .await
        .expect("supervisor should return")
        .expect("config is valid");
        assert_eq!(exit, SupervisorExit::Interrupted);
    }

    #[tokio::test]
    async fn invalid_restart_delay_is_rejected() {
        let mut config = Config::default();
        config.supervisor.restart_delay = "eventually".to_string();
        let (_lines, input) = idle_input();
        let recorder = Recorder::default();

        let result = run(&config, input, recorder.factory(), std::future::pending()).await;
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDuration { .. })
        ));
    }
}
