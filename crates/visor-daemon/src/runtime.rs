//! The fixed-rate main loop.
//!
//! Each iteration drains the control channel (commands apply
//! immediately, events batch for the app), ticks the pipeline, ships
//! the output, and sleeps the remainder of the frame budget. Nothing
//! that goes wrong in here may stop the loop: failures are logged and
//! the loop idles briefly before the next attempt.

use std::time::Duration;

use log::{info, warn};
use tokio::time::Instant;
use visor_engine::{Event, Pipeline, Query};

use crate::control::{Control, ControlReceiver};
use crate::transport::Driver;

/// Idle pause when there is nothing to render or something failed.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

pub async fn run(
    mut pipeline: Pipeline,
    mut driver: Driver,
    mut ctrl: ControlReceiver,
    target_fps: u32,
) {
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)));
    info!("main loop running at {target_fps} fps");

    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        let dt = (now - last).as_secs_f32();
        last = now;

        // Everything that arrived before this tick, in order. Commands
        // mutate the pipeline right away; events batch for update().
        let mut events: Vec<Event> = Vec::new();
        while let Ok(message) = ctrl.try_recv() {
            match message {
                Control::Event(event) => events.push(event),
                command => apply_command(&mut pipeline, &mut driver, command).await,
            }
        }

        match pipeline.tick(dt, &events) {
            Some(output) => {
                driver.send_frame(output.matrix.as_bytes()).await;
                driver.send_strip(&output.strip).await;

                let elapsed = now.elapsed();
                if elapsed < frame_time {
                    tokio::time::sleep(frame_time - elapsed).await;
                } else {
                    // Over budget; still give other tasks a chance.
                    tokio::task::yield_now().await;
                }
            }
            None => tokio::time::sleep(IDLE_SLEEP).await,
        }
    }
}

async fn apply_command(pipeline: &mut Pipeline, driver: &mut Driver, command: Control) {
    match command {
        Control::Event(_) => unreachable!("events are drained by the caller"),
        Control::Activate { name, reply } => {
            let result = pipeline.activate_app(&name, true);
            if let Err(e) = &result {
                warn!("activation rejected: {e}");
            }
            let _ = reply.send(result);
        }
        Control::GetActiveApp { reply } => {
            let _ = reply.send(pipeline.apps.active_name().map(str::to_string));
        }
        Control::AddEffect {
            name,
            params,
            reply,
        } => {
            let _ = reply.send(pipeline.effects.add_by_name(&name, &params));
        }
        Control::RemoveEffect { id, reply } => {
            let _ = reply.send(pipeline.effects.remove_by_id(&id));
        }
        Control::ClearEffects { reply } => {
            pipeline.effects.clear();
            let _ = reply.send(());
        }
        Control::ListEffects { reply } => {
            let list = pipeline
                .effects
                .list()
                .into_iter()
                .map(|(id, name)| (id, name.to_string()))
                .collect();
            let _ = reply.send(list);
        }
        Control::SaveEffects { reply } => {
            let _ = reply.send(pipeline.effects.save_params());
        }
        Control::RestoreEffects { params, reply } => {
            pipeline.effects.restore(&params);
            let _ = reply.send(());
        }
        Control::SetMirror { mode, reply } => {
            pipeline.display.set_mirror_mode(mode);
            let _ = reply.send(());
        }
        Control::GetMirror { reply } => {
            let _ = reply.send(pipeline.display.mirror_mode());
        }
        Control::SetBrightness { level, reply } => {
            driver.send_brightness(level).await;
            let _ = reply.send(());
        }
        Control::Query {
            app,
            name,
            payload,
            reply,
        } => {
            let result = pipeline
                .apps
                .get_mut(&app)
                .map(|a| a.handle_query(&Query::new(name, payload)));
            let _ = reply.send(result);
        }
    }
}
