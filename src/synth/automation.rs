//! Breakpoint automation curves
//!
//! Envelopes and filter sweeps are described as an ordered list of
//! breakpoints on the audio clock instead of a running state machine.
//! A curve is evaluated at an absolute time, so the same schedule can
//! be rendered by the real-time callback or by an offline clock.

/// Smallest value an exponential segment may start from or approach
pub const MIN_EXP_VALUE: f64 = 1e-4;

/// How a segment approaches its breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Jump to the value at the breakpoint time
    Step,
    /// Straight line from the previous breakpoint
    Linear,
    /// Constant-ratio curve from the previous breakpoint
    Exponential,
}

/// A single scheduled parameter change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Absolute clock time in seconds
    pub time: f64,
    /// Value reached at `time`
    pub value: f64,
    /// Curve used to get there
    pub kind: CurveKind,
}

/// An automated parameter
#[derive(Debug, Clone)]
pub struct AutomationCurve {
    initial: f64,
    points: Vec<Breakpoint>,
    scheduled: usize,
}

impl AutomationCurve {
    /// Create a curve that holds `initial` until the first breakpoint
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            points: Vec::new(),
            scheduled: 0,
        }
    }

    /// Jump to `value` at `time`
    pub fn set_value_at(&mut self, value: f64, time: f64) -> &mut Self {
        self.schedule(Breakpoint {
            time,
            value,
            kind: CurveKind::Step,
        })
    }

    /// Ramp linearly from the previous breakpoint to `value` at `time`
    pub fn linear_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.schedule(Breakpoint {
            time,
            value,
            kind: CurveKind::Linear,
        })
    }

    /// Ramp exponentially from the previous breakpoint to `value` at `time`
    pub fn exponential_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.schedule(Breakpoint {
            time,
            value: value.max(MIN_EXP_VALUE),
            kind: CurveKind::Exponential,
        })
    }

    /// Insert a breakpoint, keeping the list ordered by time
    ///
    /// Breakpoints sharing a time keep their insertion order.
    pub fn schedule(&mut self, point: Breakpoint) -> &mut Self {
        let idx = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(idx, point);
        self.scheduled += 1;
        self
    }

    /// Drop everything scheduled from `time` on and hold the value the
    /// curve has at `time`. Returns the held value.
    ///
    /// A ramp in progress at `time` is shortened so it ends at `time`
    /// with the same shape.
    pub fn cancel_and_hold(&mut self, time: f64) -> f64 {
        let value = self.value_at(time);
        let first_cancelled = self.points.partition_point(|p| p.time < time);
        let kind = self
            .points
            .get(first_cancelled)
            .map(|p| p.kind)
            .unwrap_or(CurveKind::Step);
        self.points.truncate(first_cancelled);
        self.schedule(Breakpoint { time, value, kind });
        value
    }

    /// Evaluate the curve at an absolute time
    pub fn value_at(&self, time: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.time <= time);

        let Some(prev) = idx.checked_sub(1).map(|i| self.points[i]) else {
            return self.initial;
        };

        let Some(next) = self.points.get(idx) else {
            return prev.value;
        };

        let progress = (time - prev.time) / (next.time - prev.time);
        match next.kind {
            CurveKind::Step => prev.value,
            CurveKind::Linear => prev.value + (next.value - prev.value) * progress,
            CurveKind::Exponential => {
                let from = prev.value.max(MIN_EXP_VALUE);
                let to = next.value.max(MIN_EXP_VALUE);
                from * (to / from).powf(progress)
            }
        }
    }

    /// Scheduled breakpoints in time order
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.points
    }

    /// Total number of breakpoints ever scheduled on this curve
    pub fn scheduled_count(&self) -> usize {
        self.scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_initial_value_before_first_breakpoint() {
        let mut curve = AutomationCurve::new(0.25);
        curve.set_value_at(1.0, 2.0);

        assert_eq!(curve.value_at(0.0), 0.25);
        assert_eq!(curve.value_at(1.999), 0.25);
        assert_eq!(curve.value_at(2.0), 1.0);
    }

    #[test]
    fn test_linear_ramp() {
        let mut curve = AutomationCurve::new(0.0);
        curve.set_value_at(0.0, 1.0).linear_ramp_to(1.0, 2.0);

        assert!(close(curve.value_at(1.0), 0.0));
        assert!(close(curve.value_at(1.5), 0.5));
        assert!(close(curve.value_at(2.0), 1.0));
        assert!(close(curve.value_at(10.0), 1.0));
    }

    #[test]
    fn test_exponential_ramp_is_geometric() {
        let mut curve = AutomationCurve::new(0.0);
        curve.set_value_at(1.0, 0.0).exponential_ramp_to(0.01, 2.0);

        // Halfway in time is the geometric mean
        assert!(close(curve.value_at(1.0), 0.1));
        assert!(close(curve.value_at(2.0), 0.01));
    }

    #[test]
    fn test_exponential_from_zero_uses_floor() {
        let mut curve = AutomationCurve::new(0.0);
        curve.set_value_at(0.0, 0.0).exponential_ramp_to(1.0, 1.0);

        assert!(close(curve.value_at(0.5), (MIN_EXP_VALUE * 1.0).sqrt()));
    }

    #[test]
    fn test_step_holds_previous_value() {
        let mut curve = AutomationCurve::new(0.0);
        curve.set_value_at(0.3, 0.0).set_value_at(0.9, 1.0);

        assert_eq!(curve.value_at(0.5), 0.3);
        assert_eq!(curve.value_at(1.0), 0.9);
    }

    #[test]
    fn test_out_of_order_scheduling_is_sorted() {
        let mut curve = AutomationCurve::new(0.0);
        curve.linear_ramp_to(1.0, 2.0);
        curve.set_value_at(0.0, 1.0);

        let times: Vec<f64> = curve.breakpoints().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![1.0, 2.0]);
        assert!(close(curve.value_at(1.5), 0.5));
    }

    #[test]
    fn test_cancel_and_hold_mid_ramp() {
        let mut curve = AutomationCurve::new(0.0);
        curve
            .set_value_at(0.0, 0.0)
            .linear_ramp_to(1.0, 1.0)
            .exponential_ramp_to(0.1, 3.0);

        let held = curve.cancel_and_hold(0.5);
        assert!(close(held, 0.5));

        // Ramp up to the hold point is unchanged, later points are gone
        assert!(close(curve.value_at(0.25), 0.25));
        assert!(close(curve.value_at(2.0), 0.5));
        assert_eq!(curve.breakpoints().last().map(|p| p.time), Some(0.5));
    }

    #[test]
    fn test_cancel_then_release_ramp() {
        let mut curve = AutomationCurve::new(0.0);
        curve.set_value_at(0.0, 0.0).linear_ramp_to(0.8, 0.1);

        curve.cancel_and_hold(1.0);
        curve.exponential_ramp_to(0.001, 1.3);

        assert!(close(curve.value_at(1.0), 0.8));
        assert!(curve.value_at(1.15) < 0.8);
        assert!(close(curve.value_at(1.3), 0.001));
        assert!(close(curve.value_at(5.0), 0.001));
    }

    #[test]
    fn test_scheduled_count() {
        let mut curve = AutomationCurve::new(0.0);
        curve.set_value_at(0.0, 0.0).linear_ramp_to(1.0, 1.0);
        assert_eq!(curve.scheduled_count(), 2);

        curve.cancel_and_hold(0.5);
        assert_eq!(curve.scheduled_count(), 3);
        assert_eq!(curve.breakpoints().len(), 2);
    }
}
