use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{select, unbounded, Receiver};

use flowdeck::api;
use flowdeck::cli::{Cli, Command, MonitorArgs, SnapshotArgs};
use flowdeck::error::FlowdeckError;
use flowdeck::model::{ConnectionSnapshot, StreamStatus};
use flowdeck::state::{new_detail_scope, Aggregator, SharedMonitor};
use flowdeck::stream::{StreamConfig, Subscription};
use flowdeck::tui::ControlMsg;
use flowdeck::view::build_view;

fn exit_code(err: &FlowdeckError) -> i32 {
    match err {
        FlowdeckError::Transport(_) | FlowdeckError::HttpStatus(_) => 2,
        FlowdeckError::MalformedPayload => 3,
        _ => 4,
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let is_tui = matches!(cli.command, Some(Command::Monitor(_)) | None);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(cli)));

    // Restore terminal state only if monitor mode was used (snapshot never
    // enters the alternate screen).
    if is_tui {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen);
    }

    match result {
        Ok(Ok(())) => std::process::exit(0),
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            std::process::exit(exit_code(&e));
        }
        Err(_) => {
            eprintln!("error: fatal: unexpected panic");
            std::process::exit(4);
        }
    }
}

fn run(cli: Cli) -> Result<(), FlowdeckError> {
    match cli.command {
        Some(Command::Snapshot(args)) => run_snapshot(&args),
        Some(Command::Monitor(args)) => run_monitor(&args),
        None => run_monitor(&MonitorArgs {
            connect: Default::default(),
            sort: Default::default(),
            group: Default::default(),
            window: 60,
            no_color: false,
            search: None,
        }),
    }
}

// ---------------------------------------------------------------------------
// Snapshot mode
// ---------------------------------------------------------------------------

/// Snapshot mode: one REST fetch, group, print, exit.
fn run_snapshot(args: &SnapshotArgs) -> Result<(), FlowdeckError> {
    let snapshot = api::fetch_snapshot(
        &args.connect.endpoint,
        args.connect.access_key.as_deref(),
    )?;
    log::info!(
        "snapshot: {} groups, {} sessions",
        snapshot.groups.len(),
        snapshot.session_count()
    );

    let groups = build_view(&snapshot.groups, args.group);
    flowdeck::output::write_view(
        &groups,
        snapshot.upload_total,
        snapshot.download_total,
        args.format,
        &mut io::stdout().lock(),
    )
}

// ---------------------------------------------------------------------------
// Monitor mode (TUI)
// ---------------------------------------------------------------------------

/// Monitor mode: spawn the pipeline thread, run the console in the main
/// thread.
fn run_monitor(args: &MonitorArgs) -> Result<(), FlowdeckError> {
    let monitor = flowdeck::state::new_shared_monitor();
    let detail_scope = new_detail_scope();
    let (ctrl_tx, ctrl_rx) = unbounded::<ControlMsg>();

    let config = StreamConfig {
        base: args.connect.endpoint.clone(),
        access_key: args.connect.access_key.clone(),
        interval_ms: args.connect.interval,
    };
    let window_ms = args.window as i64 * 1_000;
    // One chart slot per push interval across the window.
    let chart_slots = (window_ms / args.connect.interval as i64).max(1) as usize;

    let monitor_for_pipeline = Arc::clone(&monitor);
    let scope_for_pipeline = Arc::clone(&detail_scope);
    let interval_ms = args.connect.interval as i64;
    let pipeline_config = config.clone();
    let pipeline_handle = thread::Builder::new()
        .name("flowdeck-pipeline".into())
        .spawn(move || {
            pipeline_loop(
                pipeline_config,
                chart_slots,
                interval_ms,
                scope_for_pipeline,
                &monitor_for_pipeline,
                &ctrl_rx,
            );
        })
        .map_err(|e| FlowdeckError::Fatal(format!("spawn pipeline thread: {e}")))?;

    let tui_result = flowdeck::tui::run_tui(
        monitor,
        detail_scope,
        ctrl_tx,
        Duration::from_millis(250),
        args.sort,
        args.group,
        window_ms,
        args.no_color,
        args.search.as_deref(),
    );

    // run_tui sent Quit (or dropped the sender) on the way out.
    let _ = pipeline_handle.join();

    tui_result
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A live push subscription and its snapshot channel. `None` while paused.
type StreamHandle = (Subscription, Receiver<ConnectionSnapshot>);

/// One input to the pipeline loop, pulled out of the select so the stream
/// handle can be replaced afterwards.
enum PipelineInput {
    Ctrl(ControlMsg),
    Snap(ConnectionSnapshot, StreamStatus),
    Disconnected,
}

/// Pipeline thread: owns the push subscription and the aggregator, publishes
/// derived state into the shared cell.
///
/// Every snapshot that arrives is ingested exactly once, in arrival order.
/// The renderer may skip published frames, but never the diffing that
/// produced them. Pausing tears the subscription down and drops any frames
/// it had buffered; resuming opens a fresh one. Aggregator state (ledger,
/// previous totals) survives the pause, so sessions that vanished while
/// paused still land in the closed ledger on the first frame after resume.
fn pipeline_loop(
    config: StreamConfig,
    chart_slots: usize,
    interval_ms: i64,
    detail_scope: flowdeck::state::DetailScope,
    monitor: &SharedMonitor,
    ctrl_rx: &Receiver<ControlMsg>,
) {
    let mut agg = Aggregator::new(chart_slots, interval_ms, detail_scope);

    // Initial load over REST so the console has data before the first push.
    match api::fetch_snapshot(&config.base, config.access_key.as_deref()) {
        Ok(snapshot) => {
            publish(monitor, &mut agg, snapshot, StreamStatus::Connecting);
        }
        Err(e) => log::warn!("initial snapshot fetch failed: {e}"),
    }

    let mut stream: Option<StreamHandle> = match Subscription::spawn(config.clone()) {
        Ok(pair) => Some(pair),
        Err(e) => {
            log::warn!("stream subscription failed: {e}");
            return;
        }
    };

    loop {
        let input = match &stream {
            Some((subscription, snap_rx)) => select! {
                recv(ctrl_rx) -> msg => match msg {
                    Ok(msg) => PipelineInput::Ctrl(msg),
                    Err(_) => PipelineInput::Disconnected,
                },
                recv(snap_rx) -> snapshot => match snapshot {
                    Ok(snapshot) => PipelineInput::Snap(snapshot, subscription.status()),
                    Err(_) => PipelineInput::Disconnected,
                },
            },
            None => match ctrl_rx.recv() {
                Ok(msg) => PipelineInput::Ctrl(msg),
                Err(_) => PipelineInput::Disconnected,
            },
        };

        match input {
            PipelineInput::Snap(snapshot, status) => {
                publish(monitor, &mut agg, snapshot, status);
            }
            PipelineInput::Ctrl(msg) => {
                if handle_control(msg, &config, monitor, &mut agg, &mut stream) {
                    break;
                }
            }
            PipelineInput::Disconnected => break,
        }
    }

    if let Some((subscription, _)) = stream {
        subscription.cancel();
    }
}

/// Apply one control message. Returns `true` when the pipeline should exit.
fn handle_control(
    msg: ControlMsg,
    config: &StreamConfig,
    monitor: &SharedMonitor,
    agg: &mut Aggregator,
    stream: &mut Option<StreamHandle>,
) -> bool {
    match msg {
        ControlMsg::Pause => {
            // Cancel joins the stream thread and drops the receiver along
            // with anything still queued on it.
            if let Some((subscription, _)) = stream.take() {
                subscription.cancel();
            }
            set_status(monitor, StreamStatus::Paused);
        }
        ControlMsg::Resume => {
            if stream.is_none() {
                match Subscription::spawn(config.clone()) {
                    Ok(pair) => {
                        *stream = Some(pair);
                        set_status(monitor, StreamStatus::Connecting);
                    }
                    Err(e) => log::warn!("stream subscription failed: {e}"),
                }
            }
        }
        ControlMsg::Close(ids) => {
            // A failed close leaves every piece of state unchanged; the user
            // retries. A successful one re-fetches rather than waiting for
            // the next push.
            match api::close_connections(&config.base, config.access_key.as_deref(), &ids) {
                Ok(()) => {
                    log::info!("closed {} session(s)", ids.len());
                    match api::fetch_snapshot(&config.base, config.access_key.as_deref()) {
                        Ok(snapshot) => {
                            publish(monitor, agg, snapshot, StreamStatus::Live);
                        }
                        Err(e) => log::warn!("post-close fetch failed: {e}"),
                    }
                }
                Err(e) => log::warn!("close action failed: {e}"),
            }
        }
        ControlMsg::Quit => return true,
    }
    false
}

fn publish(
    monitor: &SharedMonitor,
    agg: &mut Aggregator,
    snapshot: ConnectionSnapshot,
    status: StreamStatus,
) {
    let state = agg.ingest(snapshot, status, now_ms());
    monitor.store(Arc::new(state));
}

fn set_status(monitor: &SharedMonitor, status: StreamStatus) {
    let mut state = (**monitor.load()).clone();
    state.status = status;
    monitor.store(Arc::new(state));
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck::state::new_shared_monitor;

    fn test_config() -> StreamConfig {
        // Nothing listens on port 1; the stream thread just retries in the
        // background until cancelled.
        StreamConfig {
            base: "http://127.0.0.1:1".to_string(),
            access_key: None,
            interval_ms: 1_000,
        }
    }

    #[test]
    fn pause_tears_down_the_subscription() {
        let config = test_config();
        let monitor = new_shared_monitor();
        let mut agg = Aggregator::new(4, 1_000, new_detail_scope());
        let mut stream: Option<StreamHandle> = match Subscription::spawn(config.clone()) {
            Ok(pair) => Some(pair),
            Err(e) => panic!("spawn failed: {e}"),
        };

        let quit = handle_control(
            ControlMsg::Pause,
            &config,
            &monitor,
            &mut agg,
            &mut stream,
        );
        assert!(!quit);
        assert!(stream.is_none());
        assert_eq!(monitor.load().status, StreamStatus::Paused);
    }

    #[test]
    fn resume_opens_a_fresh_subscription() {
        let config = test_config();
        let monitor = new_shared_monitor();
        let mut agg = Aggregator::new(4, 1_000, new_detail_scope());
        let mut stream: Option<StreamHandle> = None;
        set_status(&monitor, StreamStatus::Paused);

        let quit = handle_control(
            ControlMsg::Resume,
            &config,
            &monitor,
            &mut agg,
            &mut stream,
        );
        assert!(!quit);
        assert!(stream.is_some());
        assert_eq!(monitor.load().status, StreamStatus::Connecting);

        if let Some((subscription, _)) = stream.take() {
            subscription.cancel();
        }
    }

    #[test]
    fn quit_stops_the_pipeline() {
        let config = test_config();
        let monitor = new_shared_monitor();
        let mut agg = Aggregator::new(4, 1_000, new_detail_scope());
        let mut stream: Option<StreamHandle> = None;

        let quit = handle_control(ControlMsg::Quit, &config, &monitor, &mut agg, &mut stream);
        assert!(quit);
    }
}
