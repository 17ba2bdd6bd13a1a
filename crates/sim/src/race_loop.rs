use skyrace_shared::*;

use crate::policy::ControlSource;
use crate::sensors::Arena;
use crate::session::RaceSession;
use crate::telemetry::race_result;
use crate::track::CheckpointTrack;

/// Run an interactive race, one racer per control source. Racer 0 is the
/// primary: the race finishes when it completes the last lap, or after
/// `max_ticks`.
pub fn run_race(
    config: &RaceConfig,
    track: CheckpointTrack,
    arena: Arena,
    sources: &mut [Box<dyn ControlSource>],
    max_ticks: u32,
) -> Result<RaceReplay, RaceError> {
    let config = RaceConfig {
        mode: RaceMode::Interactive,
        ..config.clone()
    };
    let names: Vec<String> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}-{}", s.name(), i))
        .collect();
    let checkpoints = track.iter().map(|c| c.position().to_array()).collect();

    let mut session = RaceSession::new(config.clone(), track, arena, &names, AgentId(0), 0)?;
    let mut frames = Vec::new();

    session.begin()?;
    frames.push(session.snapshot());

    for _ in 0..max_ticks {
        let inputs: Vec<ControlInput> = sources
            .iter_mut()
            .enumerate()
            .map(|(i, source)| source.act(&session.observe(AgentId(i))))
            .collect();

        session.step(&inputs)?;

        if session.tick() % FRAME_INTERVAL == 0 {
            frames.push(session.snapshot());
        }

        if session.state() == RaceState::Finished {
            if session.tick() % FRAME_INTERVAL != 0 {
                frames.push(session.snapshot());
            }
            break;
        }
    }

    Ok(RaceReplay {
        config,
        checkpoints,
        frames,
        result: race_result(&session),
    })
}
