use std::time::{Duration, Instant};

use almaseo_refresh::{EditorEvent, PanelController};
use anyhow::Result;
use chrono::Local;

use super::build_guard;
use crate::cli::args::{SiteArgs, WatchArgs};
use crate::exit_codes;

pub async fn run(site: &SiteArgs, args: WatchArgs) -> Result<i32> {
    if args.interval == 0 {
        eprintln!("error: --interval must be at least 1 second");
        return Ok(exit_codes::CONFIG_ERROR);
    }
    let interval = Duration::from_secs(args.interval);

    let (guard, sink) = match build_guard(site, args.post_id) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::for_error(&e));
        }
    };
    // Every tick counts as the tab coming back into view; the half-interval
    // floor only matters if ticks bunch up after a slow response.
    let mut controller = PanelController::new(guard).with_focus_min_interval(interval / 2);

    eprintln!(
        "Watching post {} every {}s. Press Ctrl+C to stop.\n",
        args.post_id, args.interval
    );

    let mut completed = 0u64;
    let mut last_code = exit_codes::SUCCESS;
    controller.handle(EditorEvent::ManualRefresh);

    loop {
        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            _ = controller.guard().settled() => false,
        };
        if interrupted {
            break;
        }

        completed += 1;
        let timestamp = Local::now().format("%H:%M:%S");
        match sink.last_error() {
            Some(err) => {
                eprintln!("[{}] check failed: {}", timestamp, err);
                last_code = exit_codes::for_error(&err);
            }
            None => {
                eprintln!("[{}] check #{}", timestamp, completed);
                print!("{}", sink.panel.lock().render(Instant::now()));
                last_code = exit_codes::SUCCESS;
            }
        }
        eprintln!("---");

        if args.count.is_some_and(|n| completed >= n) {
            break;
        }

        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            _ = tokio::time::sleep(interval) => false,
        };
        if interrupted {
            break;
        }
        controller.handle(EditorEvent::FocusRegained);
    }

    controller.handle(EditorEvent::Unmount);
    eprintln!("Stopping watch loop.");
    Ok(last_code)
}
