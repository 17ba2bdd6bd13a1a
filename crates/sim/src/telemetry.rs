use glam::Vec3;
use serde::Serialize;
use skyrace_shared::{AgentId, RaceResult, RaceState};

use crate::ranking::ordinal;
use crate::session::RaceSession;

/// What the heads-up display shows for the followed aircraft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudTelemetry {
    pub agent: AgentId,
    /// "1st", "2nd", ...; empty before the first ranking.
    pub place: String,
    pub rank: u32,
    /// Never shown past the final lap.
    pub lap: u32,
    pub total_laps: u32,
    pub time_remaining: f32,
    /// Horizontal angle from the nose to the next checkpoint, positive to the right.
    pub bearing_deg: f32,
    /// Unit vector to the next checkpoint in the aircraft frame.
    pub direction: Vec3,
    pub distance: f32,
}

pub fn hud(session: &RaceSession, id: AgentId) -> HudTelemetry {
    let progress = &session.progress()[id];
    let body = &session.racer(id).body;
    let to_next = session.track().at(progress.next_checkpoint).position() - body.position;
    let local = body.pose().inverse_transform_direction(to_next);
    let total_laps = session.progress().num_laps();

    HudTelemetry {
        agent: id,
        place: ordinal(progress.rank),
        rank: progress.rank,
        lap: progress.lap.min(total_laps),
        total_laps,
        time_remaining: progress.time_remaining,
        bearing_deg: local.x.atan2(local.z).to_degrees(),
        direction: local.normalize_or_zero(),
        distance: to_next.length(),
    }
}

/// End-of-race summary for the game-over screen.
pub fn race_result(session: &RaceSession) -> RaceResult {
    RaceResult {
        finished: session.state() == RaceState::Finished,
        final_tick: session.tick(),
        race_time: session.race_time() as f32,
        primary: session.progress().primary(),
        standings: session.standings(),
    }
}
