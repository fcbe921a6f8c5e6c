//! Entry session - the single owner of the render state
//!
//! One spawned task per displayed credential. It owns the [`RenderState`]
//! outright and serializes everything that can change it: the ~1 Hz
//! regeneration tick, token changes, toggle requests, explicit errors, and
//! the toggle auto-revert deadline. Each transition publishes a complete new
//! state through a `watch` channel; the host never observes a partial
//! update.

use gatepass_clock::ClockSyncCoordinator;
use gatepass_core::{EntryDescriptor, OtpConfig, OtpGenerator};
use gatepass_render::{BarcodeCodec, ErrorDisplay, ErrorIcon, RenderState, DEFAULT_ERROR_TEXT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Cadence of rotating-code regeneration
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long the backup QR stays up before auto-reverting to the live code
pub const DEFAULT_TOGGLE_REVERT: Duration = Duration::from_secs(10);

/// Per-session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between regeneration ticks
    pub tick_interval: Duration,
    /// Backup-code auto-revert deadline
    pub toggle_revert: Duration,
    /// Subtitle shown under PDF417 symbols
    pub pdf417_subtitle: String,
    /// Subtitle shown under QR symbols
    pub qr_subtitle: String,
    /// One-time-code parameters for rotating tickets
    pub otp: OtpConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            toggle_revert: DEFAULT_TOGGLE_REVERT,
            pdf417_subtitle: String::new(),
            qr_subtitle: String::new(),
            otp: OtpConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set the regeneration tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Builder pattern: set the backup-code auto-revert deadline
    pub fn with_toggle_revert(mut self, deadline: Duration) -> Self {
        self.toggle_revert = deadline;
        self
    }

    /// Builder pattern: set the PDF417 subtitle
    pub fn with_pdf417_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.pdf417_subtitle = subtitle.into();
        self
    }

    /// Builder pattern: set the QR subtitle
    pub fn with_qr_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.qr_subtitle = subtitle.into();
        self
    }

    /// Builder pattern: set the one-time-code parameters
    pub fn with_otp(mut self, otp: OtpConfig) -> Self {
        self.otp = otp;
        self
    }
}

/// Discrete events from the host
enum Command {
    SetToken {
        token: String,
        error_text: Option<String>,
    },
    ClearToken,
    Toggle,
    ShowError {
        message: String,
        icon: ErrorIcon,
    },
}

/// Handle to a running entry session.
///
/// Dropping the handle stops the session loop.
pub struct EntrySession {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<RenderState>,
    descriptor_rx: watch::Receiver<Option<EntryDescriptor>>,
}

impl EntrySession {
    /// Spawn a session loop onto the current tokio runtime.
    ///
    /// Also kicks off the (process-wide, single-flight) clock sync in the
    /// background so rotating tickets pick up trusted time as soon as it is
    /// available.
    pub fn spawn(
        codec: Arc<dyn BarcodeCodec>,
        clock: Arc<ClockSyncCoordinator>,
        config: SessionConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(RenderState::None);
        let (descriptor_tx, descriptor_rx) = watch::channel(None);
        let (sync_tx, sync_rx) = mpsc::channel(1);

        {
            let clock = Arc::clone(&clock);
            tokio::spawn(async move {
                clock.ensure_synced().await;
                let _ = sync_tx.send(()).await;
            });
        }

        let actor = SessionActor {
            otp: OtpGenerator::new(config.otp),
            codec,
            clock,
            config,
            state_tx,
            descriptor_tx,
            raw_token: None,
            descriptor: None,
            error_text: None,
            state: RenderState::None,
            toggle_deadline: None,
            clock_settled: false,
        };
        tokio::spawn(actor.run(cmd_rx, sync_rx));

        Self {
            cmd_tx,
            state_rx,
            descriptor_rx,
        }
    }

    /// Supply a new raw token, with optional custom error text.
    ///
    /// An unchanged token keeps the existing descriptor (and any live
    /// rotation); a changed one is reclassified and rendered from scratch.
    pub async fn set_token(&self, token: impl Into<String>, error_text: Option<String>) {
        self.send(Command::SetToken {
            token: token.into(),
            error_text,
        })
        .await;
    }

    /// Clear the token and return to the idle state.
    pub async fn clear_token(&self) {
        self.send(Command::ClearToken).await;
    }

    /// Request the backup-code toggle.
    ///
    /// A no-op unless the live state is a rotating PDF417 with a backup
    /// barcode.
    pub async fn toggle(&self) {
        self.send(Command::Toggle).await;
    }

    /// Display a caller-supplied error panel.
    pub async fn show_error(&self, message: impl Into<String>, icon: ErrorIcon) {
        self.send(Command::ShowError {
            message: message.into(),
            icon,
        })
        .await;
    }

    /// The current render state.
    pub fn state(&self) -> RenderState {
        self.state_rx.borrow().clone()
    }

    /// Watch render state changes.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.state_rx.clone()
    }

    /// The current classified descriptor, for introspection and tests.
    pub fn descriptor(&self) -> Option<EntryDescriptor> {
        self.descriptor_rx.borrow().clone()
    }

    /// Watch descriptor changes (fires only on reclassification).
    pub fn descriptor_watch(&self) -> watch::Receiver<Option<EntryDescriptor>> {
        self.descriptor_rx.clone()
    }

    async fn send(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("session loop is gone, dropping command");
        }
    }
}

/// The state-owning task
struct SessionActor {
    codec: Arc<dyn BarcodeCodec>,
    clock: Arc<ClockSyncCoordinator>,
    config: SessionConfig,
    otp: OtpGenerator,
    state_tx: watch::Sender<RenderState>,
    descriptor_tx: watch::Sender<Option<EntryDescriptor>>,
    raw_token: Option<String>,
    descriptor: Option<EntryDescriptor>,
    error_text: Option<String>,
    state: RenderState,
    toggle_deadline: Option<Instant>,
    clock_settled: bool,
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>, mut sync_rx: mpsc::Receiver<()>) {
        // First tick lands one interval from now; the initial render happens
        // on token arrival, not on the timer.
        let mut ticker = time::interval_at(
            Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.toggle_deadline;
            let revert = async move {
                match deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        debug!("session handle dropped, stopping loop");
                        break;
                    }
                },
                _ = ticker.tick() => self.on_tick(),
                _ = revert => self.on_toggle_expired(),
                settled = sync_rx.recv(), if !self.clock_settled => {
                    self.clock_settled = true;
                    if settled.is_some() {
                        self.on_clock_settled();
                    }
                }
            }
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetToken { token, error_text } => self.on_set_token(token, error_text),
            Command::ClearToken => self.on_clear_token(),
            Command::Toggle => self.on_toggle(),
            Command::ShowError { message, icon } => self.on_show_error(message, icon),
        }
    }

    fn on_set_token(&mut self, token: String, error_text: Option<String>) {
        self.error_text = error_text;

        if self.raw_token.as_deref() == Some(token.as_str()) {
            debug!("token unchanged, keeping current descriptor");
            return;
        }

        let descriptor = EntryDescriptor::classify(&token);
        debug!(valid = descriptor.is_valid(), "classified new token");

        self.raw_token = Some(token);
        self.toggle_deadline = None;
        self.descriptor = Some(descriptor.clone());
        self.descriptor_tx.send_replace(Some(descriptor));
        self.render_current();
    }

    fn on_clear_token(&mut self) {
        self.raw_token = None;
        self.descriptor = None;
        self.error_text = None;
        self.toggle_deadline = None;
        self.descriptor_tx.send_replace(None);
        self.publish(RenderState::reset());
    }

    fn on_tick(&mut self) {
        match self.state {
            // Live rotating code: regenerate every tick. Within one period
            // the payload comes out identical; that is expected.
            RenderState::RotatingPdf417 { toggled: false, .. } => self.render_rotating(true),
            // A rotating ticket still waiting on the clock renders on the
            // first tick regardless, on local time.
            RenderState::Loading => self.render_rotating(true),
            _ => {}
        }
    }

    fn on_toggle(&mut self) {
        match self.state {
            RenderState::RotatingPdf417 { toggled: false, .. } if self.state.can_toggle() => {
                let next = self
                    .state
                    .toggle_to_backup(self.codec.as_ref(), &self.config.qr_subtitle);
                let armed = next.is_toggled();
                self.publish(next);
                if armed {
                    info!("backup code shown, auto-revert armed");
                    self.toggle_deadline = Some(Instant::now() + self.config.toggle_revert);
                }
            }
            RenderState::RotatingPdf417 { toggled: true, .. } => {
                self.toggle_deadline = None;
                self.render_rotating(true);
            }
            _ => debug!("toggle ignored in the current state"),
        }
    }

    fn on_toggle_expired(&mut self) {
        self.toggle_deadline = None;
        if self.state.is_toggled() {
            debug!("backup code expired, reverting to the live code");
            self.render_rotating(true);
        }
    }

    fn on_show_error(&mut self, message: String, icon: ErrorIcon) {
        self.toggle_deadline = None;
        let next = self
            .state
            .show_custom_error(&ErrorDisplay::new(&message, icon));
        self.publish(next);
    }

    fn on_clock_settled(&mut self) {
        info!(synced = self.clock.is_synced(), "clock sync settled");
        if matches!(self.state, RenderState::Loading) {
            self.render_rotating(true);
        }
    }

    /// Render the current descriptor from scratch (new token path).
    fn render_current(&mut self) {
        let Some(descriptor) = self.descriptor.clone() else {
            self.publish(RenderState::reset());
            return;
        };

        let error = self.error_display();
        let next = match &descriptor {
            EntryDescriptor::Invalid => self.state.show_error(&error),
            EntryDescriptor::QrCode { barcode } => self.state.show_qr_code(
                self.codec.as_ref(),
                barcode,
                &self.config.qr_subtitle,
                &error,
            ),
            EntryDescriptor::StaticPdf417 { barcode } => self.state.show_static_pdf417(
                self.codec.as_ref(),
                barcode,
                &self.config.pdf417_subtitle,
                &self.config.qr_subtitle,
                &error,
            ),
            EntryDescriptor::RotatingPdf417 { .. } => {
                self.render_rotating(false);
                return;
            }
        };
        self.publish(next);
    }

    /// Render the rotating payload with fresh codes.
    ///
    /// Unless `force` is set, a rotating ticket that arrives while the
    /// single-flight clock sync is still in flight shows the loading
    /// placeholder instead; the sync-settled event or the next tick
    /// (whichever comes first) completes the render.
    fn render_rotating(&mut self, force: bool) {
        let Some(EntryDescriptor::RotatingPdf417 {
            token,
            customer_key,
            event_key,
            barcode,
        }) = self.descriptor.clone()
        else {
            return;
        };

        if !force && !self.clock_settled && !self.clock.is_synced() {
            debug!("clock sync in flight, showing the loading placeholder");
            self.publish(RenderState::Loading);
            return;
        }

        let timestamp = self.clock.timestamp();
        let customer = self.otp.generate(&customer_key, timestamp);
        let message = match &event_key {
            Some(event_key) => {
                let event = self.otp.generate(event_key, timestamp);
                format!("{}::{}::{}", token, event.code, customer.code)
            }
            None => format!("{}::{}", token, customer.code),
        };

        let error = self.error_display();
        let next = self.state.show_rotating_pdf417(
            self.codec.as_ref(),
            &message,
            barcode.as_deref(),
            &self.config.pdf417_subtitle,
            &self.config.qr_subtitle,
            &error,
        );
        self.publish(next);
    }

    fn error_display(&self) -> ErrorDisplay {
        ErrorDisplay::new(
            self.error_text.as_deref().unwrap_or(DEFAULT_ERROR_TEXT),
            ErrorIcon::Alert,
        )
    }

    fn publish(&mut self, next: RenderState) {
        self.state = next.clone();
        self.state_tx.send_replace(next);
    }
}
