//! Round-end orchestrator
//!
//! Listens for `FleetDeparted`, waits out the round-end buffer, finalizes
//! the round and schedules the restart. It never touches coordinator
//! state; it only sees the public event stream and owns the `RoundEnd`,
//! `Restart` and `RoundEndCooldown` purposes.

use crate::context::EvacContext;
use evac_logic::events::EvacEvent;
use evac_logic::phase::RoundPhase;
use evac_logic::rejection::Rejection;
use evac_logic::scheduler::Purpose;

#[derive(Debug, Default)]
pub struct RoundEndOrchestrator {
    phase: RoundPhase,
}

impl RoundEndOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// React to a coordinator event.
    pub fn observe(&mut self, ctx: &mut EvacContext, event: &EvacEvent) {
        if let EvacEvent::FleetDeparted { .. } = event {
            if self.phase != RoundPhase::InRound {
                return;
            }
            let buffer = ctx.config.round_end_buffer_duration;
            ctx.scheduler.arm(Purpose::RoundEnd, buffer);
            self.phase = RoundPhase::Ending;
            tracing::info!("Fleet departed; round ends in {:.0}s", buffer);
        }
    }

    /// Finalize immediately, skipping any pending round-end buffer.
    pub fn end_round_now(&mut self, ctx: &mut EvacContext) -> Result<(), Rejection> {
        if self.phase == RoundPhase::Restarting {
            tracing::debug!("End-round rejected: round already ended");
            return Err(Rejection::RoundAlreadyEnded);
        }
        if ctx.scheduler.is_armed(Purpose::RoundEndCooldown) {
            tracing::debug!("End-round rejected: cooldown");
            return Err(Rejection::CooldownActive);
        }
        let cooldown = ctx.config.round_end_cooldown_duration;
        if cooldown > 0.0 {
            ctx.scheduler.arm(Purpose::RoundEndCooldown, cooldown);
        }
        tracing::info!("Round end forced");
        self.finalize(ctx);
        Ok(())
    }

    /// The round-end buffer elapsed.
    pub fn on_round_end_elapsed(&mut self, ctx: &mut EvacContext) {
        if self.phase != RoundPhase::Ending {
            tracing::warn!("Stale round-end timer in phase {:?}", self.phase);
            return;
        }
        self.finalize(ctx);
    }

    fn finalize(&mut self, ctx: &mut EvacContext) {
        ctx.scheduler.cancel_purpose(Purpose::RoundEnd);
        ctx.lifecycle.finalize_round();
        self.phase = RoundPhase::Restarting;

        let eta = ctx.config.restart_duration;
        ctx.scheduler.arm(Purpose::Restart, eta);
        tracing::info!("Round ended; restarting in {:.0}s", eta);
        ctx.emit(EvacEvent::RoundEnded);
        ctx.emit(EvacEvent::RoundWillRestart { eta });
    }

    pub fn reset(&mut self) {
        self.phase = RoundPhase::InRound;
    }
}
