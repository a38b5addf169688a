//! [`TagReactiveController`] – the sandbox's decision logic.
//!
//! Reacts to four inbound message kinds and answers with servo and indicator
//! commands:
//!
//! | Inbound | Reaction |
//! |---|---|
//! | velocity report | trace log only |
//! | servo open/close button | drive the large or small dumper, set the base colour |
//! | servo percent command | advance the large dumper's open/close animation |
//! | visible tags | flash the tag-acquired colour while no dumper is busy |
//!
//! The controller never blocks. Timed follow-ups go on an internal
//! [`DeferredQueue`]; the owner polls [`TagReactiveController::next_deadline`]
//! and feeds due work back through [`TagReactiveController::poll_due`].
//!
//! # Large dumper animation
//!
//! The large dumper is driven in percent and observes its own commands, the
//! way every `set_servo_pct` subscriber sees them. Each observed percent
//! schedules the next step:
//!
//! ```text
//! 100 --1.0s--> 55          (open, forward)
//!   0 --1.0s--> 55          (open, reverse)
//!  99 --0.75s-> 0 --1.0s--> 55   (close)
//!   1 --0.75s-> 100 --1.0s--> 55
//!  55 : settled, busy cleared
//! ```
//!
//! A press that arrives mid-sequence is chained behind the queued steps, so
//! the busy flag only clears at the settle with nothing left queued for that
//! actuator.

use std::collections::HashMap;
use std::time::Duration;

use sandbox_perception::TagFrame;
use sandbox_types::{Message, ServoAction, TagDetection, VelocityPayload, Wrgb, colors};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::deferred::DeferredQueue;

/// Button id of the large dumper (intake).
pub const LARGE_DUMPER_BUTTON: i32 = 0;
/// Button id of the small dumper (intake stop).
pub const SMALL_DUMPER_BUTTON: i32 = 1;

/// Percent at which the large dumper rests after every sequence.
pub const SETTLE_PERCENT: i32 = 55;

/// Follow-up step for an observed large-dumper percent: after the delay,
/// command the returned percent.
fn animation_step(percent: i32) -> Option<(Duration, i32)> {
    match percent {
        100 => Some((Duration::from_millis(1000), SETTLE_PERCENT)),
        99 => Some((Duration::from_millis(750), 0)),
        1 => Some((Duration::from_millis(750), 100)),
        0 => Some((Duration::from_millis(1000), SETTLE_PERCENT)),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// The two mechanisms the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    LargeDumper,
    SmallDumper,
}

/// Per-actuator flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoState {
    /// Direction of the next "open" on the large dumper. Toggled by every open.
    pub direction_forward: bool,
    /// Whether the small dumper has released its load.
    pub dumped: bool,
    /// A timed sequence is running on this actuator.
    pub busy: bool,
}

impl Default for ServoState {
    fn default() -> Self {
        Self {
            direction_forward: true,
            dumped: false,
            busy: false,
        }
    }
}

/// Work that runs once its deadline passes.
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    /// Publish the command.
    Publish(Message),
    /// Clear the actuator's busy flag.
    Release(Actuator),
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Channel mapping, positions and colours used by [`TagReactiveController`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// PCM output channel of the large dumper.
    pub large_dumper_channel: i32,
    /// PCM output channel of the small dumper.
    pub small_dumper_channel: i32,
    /// Absolute position of the small dumper when dumping.
    pub small_dumper_dump_abs: i32,
    /// Absolute position of the small dumper when holding.
    pub small_dumper_rest_abs: i32,
    /// How long the small dumper stays busy after a dump.
    pub small_dumper_settle: Duration,
    /// Display time of the tag colours, in seconds.
    pub tag_color_seconds: f64,
    /// Highest tag id that counts as acquired.
    pub max_acquired_tag_id: i32,
    pub tag_acquired_color: Wrgb,
    pub open_color: Wrgb,
    pub closed_color: Wrgb,
    pub tag_frame: TagFrame,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            large_dumper_channel: 4,
            small_dumper_channel: 5,
            small_dumper_dump_abs: 1800,
            small_dumper_rest_abs: 1000,
            small_dumper_settle: Duration::from_millis(130),
            tag_color_seconds: 0.35,
            max_acquired_tag_id: 6,
            tag_acquired_color: colors::RED,
            open_color: colors::GREEN,
            closed_color: colors::BLUE,
            tag_frame: TagFrame::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Reactive controller. Every handler returns the commands to publish now.
pub struct TagReactiveController {
    config: ControllerConfig,
    states: HashMap<Actuator, ServoState>,
    deferred: DeferredQueue<Actuator, Deferred>,
}

impl Default for TagReactiveController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl TagReactiveController {
    pub fn new(config: ControllerConfig) -> Self {
        let states = [Actuator::LargeDumper, Actuator::SmallDumper]
            .into_iter()
            .map(|a| (a, ServoState::default()))
            .collect();
        Self {
            config,
            states,
            deferred: DeferredQueue::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current flags of `actuator`.
    pub fn state(&self, actuator: Actuator) -> ServoState {
        self.states.get(&actuator).copied().unwrap_or_default()
    }

    /// Whether any actuator is in a timed sequence.
    pub fn any_busy(&self) -> bool {
        self.states.values().any(|s| s.busy)
    }

    fn state_mut(&mut self, actuator: Actuator) -> &mut ServoState {
        self.states.entry(actuator).or_default()
    }

    /// Route an inbound message to its handler.
    ///
    /// Outbound-only messages (absolute servo, colours) are ignored.
    pub fn handle(&mut self, message: &Message, now: Instant) -> Vec<Message> {
        match message {
            Message::Velocity(v) => {
                self.on_velocity(v);
                Vec::new()
            }
            Message::ApriltagsVisible(p) => self.on_tag_visible(&p.tags),
            Message::SetServoOpenClose(p) => {
                self.on_servo_button(p.servo, ServoAction::from(p.action.as_str()), now)
            }
            Message::SetServoPct(p) => self.on_servo_percent(p.servo, p.percent, now),
            Message::SetServoAbs(_) | Message::SetTempColor(_) | Message::SetBaseColor(_) => Vec::new(),
        }
    }

    pub fn on_velocity(&mut self, v: &VelocityPayload) {
        trace!(vx = v.vx, vy = v.vy, vz = v.vz, "velocity");
    }

    /// Handle an open/close button press.
    pub fn on_servo_button(&mut self, servo_id: i32, action: ServoAction, now: Instant) -> Vec<Message> {
        match servo_id {
            LARGE_DUMPER_BUTTON => self.large_dumper_button(action),
            SMALL_DUMPER_BUTTON => self.small_dumper_button(action, now),
            _ => {
                debug!(servo = servo_id, "ignoring button for unknown servo");
                Vec::new()
            }
        }
    }

    fn large_dumper_button(&mut self, action: ServoAction) -> Vec<Message> {
        let channel = self.config.large_dumper_channel;
        let (percent, color) = match action {
            ServoAction::Open => {
                let state = self.state_mut(Actuator::LargeDumper);
                let percent = if state.direction_forward { 100 } else { 0 };
                state.direction_forward = !state.direction_forward;
                (percent, self.config.open_color)
            }
            ServoAction::Close => (99, self.config.closed_color),
            ServoAction::Other => return Vec::new(),
        };
        self.state_mut(Actuator::LargeDumper).busy = true;
        info!(servo = channel, percent, ?action, "large dumper");
        vec![Message::servo_pct(channel, percent), Message::base_color(color)]
    }

    fn small_dumper_button(&mut self, action: ServoAction, now: Instant) -> Vec<Message> {
        let channel = self.config.small_dumper_channel;
        if action == ServoAction::Close {
            let state = self.state_mut(Actuator::SmallDumper);
            state.dumped = true;
            state.busy = true;
            self.deferred.schedule(
                Actuator::SmallDumper,
                self.config.small_dumper_settle,
                now,
                Deferred::Release(Actuator::SmallDumper),
            );
            info!(servo = channel, "small dumper dumping");
            vec![Message::servo_abs(channel, self.config.small_dumper_dump_abs)]
        } else {
            self.state_mut(Actuator::SmallDumper).dumped = false;
            info!(servo = channel, "small dumper holding");
            vec![Message::servo_abs(channel, self.config.small_dumper_rest_abs)]
        }
    }

    /// Handle an observed servo percent command.
    ///
    /// Only the large dumper's channel animates. Returns nothing immediately;
    /// the next step, if any, is queued.
    pub fn on_servo_percent(&mut self, servo_id: i32, percent: i32, now: Instant) -> Vec<Message> {
        if servo_id != self.config.large_dumper_channel {
            return Vec::new();
        }
        if percent == SETTLE_PERCENT {
            if self.settle(Actuator::LargeDumper) {
                debug!(servo = servo_id, "large dumper settled");
            }
            return Vec::new();
        }
        if let Some((delay, next)) = animation_step(percent) {
            let deadline = self.deferred.schedule(
                Actuator::LargeDumper,
                delay,
                now,
                Deferred::Publish(Message::servo_pct(servo_id, next)),
            );
            debug!(
                servo = servo_id,
                percent,
                next,
                in_ms = deadline.saturating_duration_since(now).as_millis() as u64,
                "animation step queued"
            );
        }
        Vec::new()
    }

    /// Handle a batch of visible tags. Only the first detection is used.
    pub fn on_tag_visible(&mut self, tags: &[TagDetection]) -> Vec<Message> {
        let Some(tag) = tags.first() else {
            trace!("empty tag batch");
            return Vec::new();
        };
        let pos = self.config.tag_frame.derive_detection(tag);
        debug!(
            tag = tag.id,
            f_dist = pos.f_dist,
            s_dist = pos.s_dist,
            height = pos.height,
            "tag position"
        );

        if self.any_busy() {
            return Vec::new();
        }
        let color = if tag.id <= self.config.max_acquired_tag_id {
            self.config.tag_acquired_color
        } else {
            colors::BLANK
        };
        vec![Message::temp_color(color, self.config.tag_color_seconds)]
    }

    /// Run one deferred item.
    pub fn on_deferred(&mut self, deferred: Deferred) -> Vec<Message> {
        match deferred {
            Deferred::Publish(message) => vec![message],
            Deferred::Release(actuator) => {
                if !self.state(actuator).busy {
                    debug!(?actuator, "release of idle actuator ignored");
                } else if self.settle(actuator) {
                    debug!(?actuator, "released");
                } else {
                    debug!(?actuator, pending = self.pending(actuator), "released, next sequence queued");
                }
                Vec::new()
            }
        }
    }

    /// Clear the busy flag of `actuator` unless more of its work is queued.
    /// Returns whether the flag went from set to clear.
    fn settle(&mut self, actuator: Actuator) -> bool {
        if self.deferred.pending(actuator) > 0 {
            return false;
        }
        let state = self.state_mut(actuator);
        let was_busy = state.busy;
        state.busy = false;
        was_busy
    }

    /// Run every deferred item due at `now` and collect their commands.
    pub fn poll_due(&mut self, now: Instant) -> Vec<Message> {
        self.deferred
            .pop_due(now)
            .into_iter()
            .flat_map(|(_, item)| self.on_deferred(item))
            .collect()
    }

    /// Earliest pending deferred deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.next_deadline()
    }

    /// Number of deferred items pending for `actuator`.
    pub fn pending(&self, actuator: Actuator) -> usize {
        self.deferred.pending(actuator)
    }

    /// Drop all pending deferred work. Returns the number of dropped items.
    pub fn cancel_pending(&mut self) -> usize {
        self.deferred.cancel_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_types::{RelativePosition, Topic};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn tag(id: i32) -> TagDetection {
        TagDetection {
            id,
            horizontal_dist: 50.0,
            heading: 0.0,
            pos_rel: RelativePosition { x: 0.0, y: 10.0, z: 0.0 },
        }
    }

    fn servo_pcts(messages: &[Message]) -> Vec<(i32, i32)> {
        messages
            .iter()
            .filter_map(|m| match m {
                Message::SetServoPct(p) => Some((p.servo, p.percent)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn open_alternates_between_extremes() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();

        let first = c.on_servo_button(0, ServoAction::Open, t0);
        let second = c.on_servo_button(0, ServoAction::Open, t0);
        let third = c.on_servo_button(0, ServoAction::Open, t0);

        assert_eq!(servo_pcts(&first), vec![(4, 100)]);
        assert_eq!(servo_pcts(&second), vec![(4, 0)]);
        assert_eq!(servo_pcts(&third), vec![(4, 100)]);
    }

    #[test]
    fn open_and_close_set_distinct_base_colors() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();

        let open = c.on_servo_button(0, ServoAction::Open, t0);
        let close = c.on_servo_button(0, ServoAction::Close, t0);

        assert!(open.contains(&Message::base_color(colors::GREEN)));
        assert!(close.contains(&Message::base_color(colors::BLUE)));
        assert_eq!(servo_pcts(&close), vec![(4, 99)]);
        assert!(c.state(Actuator::LargeDumper).busy);
    }

    #[test]
    fn unknown_action_on_large_dumper_is_noop() {
        let mut c = TagReactiveController::default();
        assert!(c.on_servo_button(0, ServoAction::Other, Instant::now()).is_empty());
        assert!(!c.any_busy());
    }

    #[test]
    fn unknown_servo_ids_emit_nothing() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        assert!(c.on_servo_button(7, ServoAction::Open, t0).is_empty());
        assert!(c.on_servo_button(-1, ServoAction::Close, t0).is_empty());
        assert!(c.on_servo_percent(3, 100, t0).is_empty());
        assert!(c.next_deadline().is_none());
        assert!(c.poll_due(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn unknown_percent_is_noop() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        assert!(c.on_servo_percent(4, 42, t0).is_empty());
        assert_eq!(c.pending(Actuator::LargeDumper), 0);
    }

    #[test]
    fn percent_100_settles_to_55_after_one_second() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();

        assert!(c.on_servo_percent(4, 100, t0).is_empty());
        assert!(c.poll_due(t0 + ms(999)).is_empty());
        assert_eq!(c.poll_due(t0 + ms(1000)), vec![Message::servo_pct(4, 55)]);
        assert!(c.poll_due(t0 + ms(5000)).is_empty());
    }

    #[test]
    fn animation_table() {
        let cases = [(99, 750, 0), (1, 750, 100), (0, 1000, 55)];
        for (percent, delay, next) in cases {
            let mut c = TagReactiveController::default();
            let t0 = Instant::now();
            c.on_servo_percent(4, percent, t0);
            assert!(c.poll_due(t0 + ms(delay - 1)).is_empty(), "percent {percent} fired early");
            assert_eq!(c.poll_due(t0 + ms(delay)), vec![Message::servo_pct(4, next)]);
        }
    }

    #[test]
    fn close_sequence_runs_to_idle() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();

        // Feed every emitted percent back in, as the dispatcher does.
        let mut now = t0;
        let mut observed = Vec::new();
        let mut inbox = c.on_servo_button(0, ServoAction::Close, now);
        for _ in 0..10 {
            for msg in inbox.drain(..) {
                if msg.topic() == Topic::SetServoPct {
                    observed.push(servo_pcts(std::slice::from_ref(&msg))[0].1);
                    c.handle(&msg, now);
                }
            }
            match c.next_deadline() {
                Some(deadline) => {
                    now = deadline;
                    inbox = c.poll_due(now);
                }
                None => break,
            }
        }

        assert_eq!(observed, vec![99, 0, 55]);
        assert_eq!(now - t0, ms(1750));
        assert!(!c.state(Actuator::LargeDumper).busy);
    }

    #[test]
    fn settle_percent_clears_busy() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        c.on_servo_button(0, ServoAction::Open, t0);
        assert!(c.state(Actuator::LargeDumper).busy);

        assert!(c.on_servo_percent(4, 55, t0).is_empty());
        assert!(!c.state(Actuator::LargeDumper).busy);
    }

    #[test]
    fn overlapping_steps_are_serialised() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        c.on_servo_percent(4, 100, t0);
        c.on_servo_percent(4, 99, t0 + ms(100));

        assert_eq!(c.pending(Actuator::LargeDumper), 2);
        assert_eq!(c.poll_due(t0 + ms(1000)), vec![Message::servo_pct(4, 55)]);
        assert!(c.poll_due(t0 + ms(1749)).is_empty());
        assert_eq!(c.poll_due(t0 + ms(1750)), vec![Message::servo_pct(4, 0)]);
    }

    #[test]
    fn small_dumper_close_dumps_and_releases_once() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();

        let out = c.on_servo_button(1, ServoAction::Close, t0);
        assert_eq!(out, vec![Message::servo_abs(5, 1800)]);
        let state = c.state(Actuator::SmallDumper);
        assert!(state.dumped);
        assert!(state.busy);
        assert_eq!(c.pending(Actuator::SmallDumper), 1);

        assert!(c.poll_due(t0 + ms(129)).is_empty());
        assert!(c.state(Actuator::SmallDumper).busy);

        assert!(c.poll_due(t0 + ms(130)).is_empty());
        assert!(!c.state(Actuator::SmallDumper).busy);
        assert!(c.state(Actuator::SmallDumper).dumped);
        assert_eq!(c.pending(Actuator::SmallDumper), 0);
    }

    #[test]
    fn close_during_open_keeps_busy_until_last_settle() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();

        for msg in c.on_servo_button(0, ServoAction::Open, t0) {
            c.handle(&msg, t0);
        }
        for msg in c.on_servo_button(0, ServoAction::Close, t0 + ms(500)) {
            c.handle(&msg, t0 + ms(500));
        }

        // The open sequence settles while the close sequence is still queued.
        let settled = c.poll_due(t0 + ms(1000));
        assert_eq!(settled, vec![Message::servo_pct(4, 55)]);
        c.handle(&settled[0], t0 + ms(1000));
        assert!(c.state(Actuator::LargeDumper).busy);
        assert_eq!(c.pending(Actuator::LargeDumper), 1);
        assert!(c.on_tag_visible(&[tag(2)]).is_empty());

        let closed = c.poll_due(t0 + ms(1750));
        assert_eq!(closed, vec![Message::servo_pct(4, 0)]);
        c.handle(&closed[0], t0 + ms(1750));
        assert!(c.state(Actuator::LargeDumper).busy);

        let settled = c.poll_due(t0 + ms(2750));
        assert_eq!(settled, vec![Message::servo_pct(4, 55)]);
        c.handle(&settled[0], t0 + ms(2750));
        assert!(!c.state(Actuator::LargeDumper).busy);
        assert_eq!(c.on_tag_visible(&[tag(2)]), vec![Message::temp_color(colors::RED, 0.35)]);
    }

    #[test]
    fn repeated_small_dumper_close_releases_after_the_last() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        c.on_servo_button(1, ServoAction::Close, t0);
        c.on_servo_button(1, ServoAction::Close, t0 + ms(100));
        assert_eq!(c.pending(Actuator::SmallDumper), 2);

        assert!(c.poll_due(t0 + ms(130)).is_empty());
        assert!(c.state(Actuator::SmallDumper).busy);
        assert_eq!(c.pending(Actuator::SmallDumper), 1);
        assert!(c.on_tag_visible(&[tag(2)]).is_empty());

        assert!(c.poll_due(t0 + ms(259)).is_empty());
        assert!(c.state(Actuator::SmallDumper).busy);
        assert!(c.poll_due(t0 + ms(260)).is_empty());
        assert!(!c.state(Actuator::SmallDumper).busy);
    }

    #[test]
    fn release_of_idle_actuator_is_ignored() {
        let mut c = TagReactiveController::default();
        assert!(c.on_deferred(Deferred::Release(Actuator::SmallDumper)).is_empty());
        assert_eq!(c.state(Actuator::SmallDumper), ServoState::default());
    }

    #[test]
    fn velocity_reports_change_nothing() {
        let mut c = TagReactiveController::default();
        let now = Instant::now();
        let before = [c.state(Actuator::LargeDumper), c.state(Actuator::SmallDumper)];

        let reports = [
            VelocityPayload { vx: 0.0, vy: 0.0, vz: 0.0 },
            VelocityPayload { vx: f64::MAX, vy: f64::MIN, vz: -1e300 },
            VelocityPayload { vx: f64::NAN, vy: f64::INFINITY, vz: f64::NEG_INFINITY },
        ];
        for v in reports {
            assert!(c.handle(&Message::Velocity(v), now).is_empty());
        }

        assert!(c.next_deadline().is_none());
        assert_eq!([c.state(Actuator::LargeDumper), c.state(Actuator::SmallDumper)], before);
    }

    #[test]
    fn small_dumper_other_action_returns_to_rest() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        c.on_servo_button(1, ServoAction::Close, t0);

        let out = c.on_servo_button(1, ServoAction::Open, t0);
        assert_eq!(out, vec![Message::servo_abs(5, 1000)]);
        assert!(!c.state(Actuator::SmallDumper).dumped);

        let out = c.on_servo_button(1, ServoAction::Other, t0);
        assert_eq!(out, vec![Message::servo_abs(5, 1000)]);
    }

    #[test]
    fn low_tag_id_flashes_acquired_color() {
        let mut c = TagReactiveController::default();
        let out = c.on_tag_visible(&[tag(6), tag(9)]);
        assert_eq!(out, vec![Message::temp_color(colors::RED, 0.35)]);
    }

    #[test]
    fn high_tag_id_flashes_blank() {
        let mut c = TagReactiveController::default();
        let out = c.on_tag_visible(&[tag(7)]);
        assert_eq!(out, vec![Message::temp_color(colors::BLANK, 0.35)]);
    }

    #[test]
    fn busy_suppresses_tag_color() {
        let mut c = TagReactiveController::default();
        c.on_servo_button(1, ServoAction::Close, Instant::now());
        assert!(c.on_tag_visible(&[tag(2)]).is_empty());
    }

    #[test]
    fn empty_tag_batch_is_noop() {
        let mut c = TagReactiveController::default();
        assert!(c.on_tag_visible(&[]).is_empty());
    }

    #[test]
    fn outbound_only_messages_are_ignored() {
        let mut c = TagReactiveController::default();
        let now = Instant::now();
        assert!(c.handle(&Message::servo_abs(5, 1000), now).is_empty());
        assert!(c.handle(&Message::base_color(colors::GREEN), now).is_empty());
        assert!(c.handle(&Message::temp_color(colors::RED, 1.0), now).is_empty());
    }

    #[test]
    fn cancel_pending_drops_queued_steps() {
        let mut c = TagReactiveController::default();
        let t0 = Instant::now();
        c.on_servo_percent(4, 100, t0);
        c.on_servo_button(1, ServoAction::Close, t0);

        assert_eq!(c.cancel_pending(), 2);
        assert!(c.poll_due(t0 + Duration::from_secs(5)).is_empty());
    }
}
