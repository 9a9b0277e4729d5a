//! Unit tests for crew-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, ConvId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = AgentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(AgentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(AgentId(0) < AgentId(1));
        assert!(NodeId(100) > NodeId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(ConvId::INVALID.0, u32::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
    }
}

#[cfg(test)]
mod vec2 {
    use crate::Vec2;

    #[test]
    fn distance_and_length() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(b.length(), 5.0);
        assert_eq!(a.distance_sq(b), 25.0);
    }

    #[test]
    fn normalized_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let unit = Vec2::new(10.0, 0.0).normalized();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_length_caps_long_vectors() {
        let v = Vec2::new(30.0, 40.0).clamp_length(10.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
        // Short vectors pass through untouched.
        let short = Vec2::new(1.0, 2.0);
        assert_eq!(short.clamp_length(10.0), short);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 20.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vec2::new(5.0, 10.0));
    }

    #[test]
    fn angle_matches_atan2() {
        let v = Vec2::new(0.0, 1.0);
        assert!((v.angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        let u = Vec2::from_angle(0.3);
        assert!((u.angle() - 0.3).abs() < 1e-5);
    }
}

#[cfg(test)]
mod time {
    use std::time::Duration;

    use crate::time::MAX_DT_MS;
    use crate::{Tick, TickClock};

    #[test]
    fn advance_is_monotonic() {
        let mut clock = TickClock::new(10);
        assert_eq!(clock.current_tick, Tick::ZERO);
        assert_eq!(clock.advance(), Tick(1));
        assert_eq!(clock.advance(), Tick(2));
    }

    #[test]
    fn interval_matches_rate() {
        let clock = TickClock::new(10);
        assert_eq!(clock.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn dt_clamped_to_ceiling() {
        let dt = TickClock::clamp_dt(Duration::from_secs(5));
        assert!((dt - MAX_DT_MS as f32 / 1000.0).abs() < 1e-6);
        let small = TickClock::clamp_dt(Duration::from_millis(100));
        assert!((small - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_hz_clamped_to_one() {
        let clock = TickClock::new(0);
        assert_eq!(clock.tick_hz, 1);
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentId, AgentRng, SimRng};

    #[test]
    fn per_agent_streams_are_independent() {
        let mut a = AgentRng::new(42, AgentId(0));
        let mut b = AgentRng::new(42, AgentId(1));
        let xs: Vec<u32> = (0..8).map(|_| a.gen_range(0..1000)).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.gen_range(0..1000)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn same_seed_reproduces() {
        let mut a = AgentRng::new(7, AgentId(3));
        let mut b = AgentRng::new(7, AgentId(3));
        for _ in 0..16 {
            assert_eq!(a.gen_range(0u32..u32::MAX), b.gen_range(0u32..u32::MAX));
        }
    }

    #[test]
    fn jitter_stays_in_band() {
        let mut rng = AgentRng::new(1, AgentId(0));
        for _ in 0..100 {
            let v = rng.jitter(1000.0, 0.2);
            assert!((800.0..=1200.0).contains(&v), "jitter escaped band: {v}");
        }
    }

    #[test]
    fn child_rngs_diverge() {
        let mut root = SimRng::new(99);
        let mut c1 = root.child(1);
        let mut c2 = root.child(2);
        let a: u64 = c1.gen_range(0..u64::MAX);
        let b: u64 = c2.gen_range(0..u64::MAX);
        assert_ne!(a, b);
    }
}

#[cfg(test)]
mod config {
    use crate::SimConfig;

    #[test]
    fn default_is_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_agents_rejected() {
        let cfg = SimConfig { num_agents: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_random_interval_rejected() {
        let cfg = SimConfig {
            base_random_thought_interval_ms: [30_000, 8_000],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn relative_broadcast_path_rejected() {
        let cfg = SimConfig { broadcast_path: "stream".into(), ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
