//! Unit tests for triggers, the reasoning queue, parsing, and conversations.

use crew_agent::{ActivityState, Agent, RecentEvents, Role};
use crew_core::{AgentId, AgentRng, SimRng, Vec2};
use rustc_hash::FxHashSet;

fn bare_agent(id: u32, name: &str) -> Agent {
    Agent {
        id: AgentId(id),
        name: name.into(),
        color: 0xC51111,
        role: Role::Crewmate,
        position: Vec2::ZERO,
        velocity: Vec2::ZERO,
        facing: 0.0,
        distance_traveled: 0.0,
        path: Vec::new(),
        path_index: 0,
        activity_state: ActivityState::Idle,
        current_zone: None,
        assigned_tasks: Vec::new(),
        current_task_index: None,
        vision_radius: 250.0,
        action_radius: 50.0,
        is_thinking: false,
        last_thought_ms: 0,
        last_speech_ms: 0,
        next_random_thought_ms: u64::MAX,
        current_thought: None,
        recent_speech: None,
        current_goal: None,
        previously_visible: FxHashSet::default(),
        recent_events: RecentEvents::new(),
        conversation: None,
    }
}

// ── Trigger engine ────────────────────────────────────────────────────────────

#[cfg(test)]
mod triggers {
    use super::*;
    use crate::{Trigger, TriggerConfig, TriggerEngine, TriggerKind};

    fn engine() -> TriggerEngine {
        TriggerEngine::new(TriggerConfig::default())
    }

    #[test]
    fn spotted_and_lost_detection() {
        let eng = engine();
        let mut agent = bare_agent(0, "Red");
        agent.previously_visible.insert(AgentId(2));

        let visible = vec![(AgentId(1), "Blue".to_string(), 120.0)];
        let triggers = eng.collect(&agent, &visible, None, None, 0);

        assert!(triggers.iter().any(|t| t.kind == TriggerKind::AgentSpotted
            && t.other == Some(AgentId(1))));
        assert!(triggers.iter().any(|t| t.kind == TriggerKind::AgentLostSight
            && t.other == Some(AgentId(2))));
    }

    #[test]
    fn close_pass_detection() {
        let eng = engine();
        let mut agent = bare_agent(0, "Red");
        agent.previously_visible.insert(AgentId(1)); // already seen — no spotted
        let visible = vec![(AgentId(1), "Blue".to_string(), 30.0)];
        let triggers = eng.collect(&agent, &visible, None, None, 0);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].kind, TriggerKind::PassedAgentClosely);
    }

    #[test]
    fn entered_room_needs_both_zones() {
        let eng = engine();
        let mut agent = bare_agent(0, "Red");

        // Hallway → room: no trigger (previous zone was None).
        agent.current_zone = Some(1);
        let t = eng.collect(&agent, &[], None, Some("medbay"), 0);
        assert!(t.is_empty());

        // Room → different room: trigger.
        let t = eng.collect(&agent, &[], Some(0), Some("medbay"), 0);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].kind, TriggerKind::EnteredRoom);

        // Same room: nothing.
        let t = eng.collect(&agent, &[], Some(1), Some("medbay"), 0);
        assert!(t.is_empty());
    }

    #[test]
    fn idle_random_fires_when_due() {
        let eng = engine();
        let mut agent = bare_agent(0, "Red");
        agent.next_random_thought_ms = 5_000;
        assert!(eng.collect(&agent, &[], None, None, 4_999).is_empty());
        let t = eng.collect(&agent, &[], None, None, 5_000);
        assert_eq!(t[0].kind, TriggerKind::IdleRandom);
    }

    #[test]
    fn priority_order_prefers_spotted() {
        let eng = engine();
        let mut agent = bare_agent(0, "Red");
        agent.last_thought_ms = 0;
        let mut rng = AgentRng::new(1, AgentId(0));
        let triggers = vec![
            Trigger::new(TriggerKind::IdleRandom, "idle"),
            Trigger::new(TriggerKind::AgentSpotted, "spotted Blue"),
            Trigger::new(TriggerKind::EnteredRoom, "entered medbay"),
        ];
        let req = eng
            .decide(&agent, triggers, false, 100_000, 1.0, &mut rng)
            .expect("thought should be permitted");
        assert_eq!(req.trigger.kind, TriggerKind::AgentSpotted);
        assert!(!req.want_speech, "no one in earshot");
    }

    #[test]
    fn thought_cooldown_scenario() {
        // agent_spotted at t=0, 3000, 9000 with a 6000 ms cooldown and
        // coefficient 1.0: thoughts at t=0 and t=9000 only.
        let eng = engine();
        let mut agent = bare_agent(0, "Red");
        let mut rng = AgentRng::new(1, AgentId(0));
        let t0 = 100_000u64;
        agent.last_thought_ms = 0;

        let spotted = || vec![Trigger::new(TriggerKind::AgentSpotted, "spotted Blue")];

        assert!(eng.decide(&agent, spotted(), false, t0, 1.0, &mut rng).is_some());
        agent.last_thought_ms = t0; // thought emitted

        assert!(eng.decide(&agent, spotted(), false, t0 + 3_000, 1.0, &mut rng).is_none());
        assert!(eng.decide(&agent, spotted(), false, t0 + 9_000, 1.0, &mut rng).is_some());
    }

    #[test]
    fn coefficient_scales_cooldowns() {
        let eng = engine();
        assert_eq!(eng.effective_thought_cooldown_ms(1.0), 6_000);
        // Half coefficient → doubled cooldown (less thinking under load).
        assert_eq!(eng.effective_thought_cooldown_ms(0.5), 12_000);
        assert_eq!(eng.effective_thought_cooldown_ms(2.0), 3_000);
        assert_eq!(eng.effective_speech_cooldown_ms(0.25), 48_000);
    }

    #[test]
    fn thinking_agents_do_not_reenter() {
        let eng = engine();
        let mut agent = bare_agent(0, "Red");
        agent.is_thinking = true;
        let mut rng = AgentRng::new(1, AgentId(0));
        let triggers = vec![Trigger::new(TriggerKind::AgentSpotted, "spotted Blue")];
        assert!(eng.decide(&agent, triggers, false, 100_000, 1.0, &mut rng).is_none());
    }

    #[test]
    fn random_thought_jitter_in_band() {
        let eng = engine();
        let mut rng = AgentRng::new(1, AgentId(0));
        // Base interval [8000, 30000] with ±20 % jitter → [6400, 36000].
        for _ in 0..200 {
            let next = eng.next_random_thought_ms(0, &mut rng);
            assert!((6_400..=36_000).contains(&next), "out of band: {next}");
        }
    }
}

// ── Reasoning queue ───────────────────────────────────────────────────────────

#[cfg(test)]
mod queue {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::queue::TaskFn;
    use crate::{ChatOutcome, MindError, ReasoningQueue};

    fn outcome(text: &str) -> ChatOutcome {
        ChatOutcome { text: text.into(), prompt_tokens: 10, completion_tokens: 5 }
    }

    fn instant_task(text: &'static str) -> TaskFn {
        Box::new(move || Box::pin(async move { Ok(outcome(text)) }))
    }

    fn slow_task(text: &'static str, delay: Duration) -> TaskFn {
        Box::new(move || {
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(outcome(text))
            })
        })
    }

    #[tokio::test]
    async fn resolves_with_text() {
        let q = ReasoningQueue::start(Duration::from_secs(5));
        let out = q.enqueue(instant_task("hello"), None).await.unwrap();
        assert_eq!(out.text, "hello");
    }

    #[tokio::test]
    async fn fifo_order_no_interleaving() {
        let q = ReasoningQueue::start(Duration::from_secs(30));
        let order = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..100usize {
            let order = Arc::clone(&order);
            let running = Arc::clone(&running);
            let overlaps = Arc::clone(&overlaps);
            let task: TaskFn = Box::new(move || {
                Box::pin(async move {
                    if running.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    order.lock().unwrap().push(i);
                    running.store(false, Ordering::SeqCst);
                    Ok(outcome("ok"))
                })
            });
            handles.push(q.enqueue(task, None));
        }

        let mut completed = 0;
        for h in handles {
            h.await.unwrap();
            completed += 1;
        }
        assert_eq!(completed, 100, "exactly 100 completions");
        assert_eq!(overlaps.load(Ordering::SeqCst), 0, "execution interleaved");
        let order = order.lock().unwrap();
        assert_eq!(*order, (0..100).collect::<Vec<_>>(), "not FIFO");
    }

    #[tokio::test]
    async fn in_flight_deadline_times_out() {
        let q = ReasoningQueue::start(Duration::from_millis(50));
        let err = q
            .enqueue(slow_task("late", Duration::from_secs(5)), None)
            .await
            .unwrap_err();
        assert_eq!(err, MindError::Timeout);
    }

    #[tokio::test]
    async fn queued_deadline_times_out() {
        let q = ReasoningQueue::start(Duration::from_secs(10));
        // Occupy the worker for 300 ms; the second request only gets 50 ms.
        let first = q.enqueue(slow_task("slow", Duration::from_millis(300)), None);
        let second = q.enqueue(instant_task("starved"), Some(Duration::from_millis(50)));
        assert_eq!(second.await.unwrap_err(), MindError::Timeout);
        assert!(first.await.is_ok());
    }

    #[tokio::test]
    async fn clear_cancels_pending_and_in_flight() {
        let q = ReasoningQueue::start(Duration::from_secs(10));
        let in_flight = q.enqueue(slow_task("stuck", Duration::from_secs(30)), None);
        let waiting: Vec<_> = (0..3)
            .map(|_| q.enqueue(instant_task("waiting"), None))
            .collect();

        // Give the worker a moment to pick up the first task.
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.clear();

        assert_eq!(in_flight.await.unwrap_err(), MindError::Cancelled);
        for w in waiting {
            assert_eq!(w.await.unwrap_err(), MindError::Cancelled);
        }
    }

    #[tokio::test]
    async fn queue_usable_after_clear() {
        let q = ReasoningQueue::start(Duration::from_secs(5));
        q.clear();
        let out = q.enqueue(instant_task("revived"), None).await.unwrap();
        assert_eq!(out.text, "revived");
    }

    #[tokio::test]
    async fn stats_track_success_and_tokens() {
        let q = ReasoningQueue::start(Duration::from_secs(5));
        for _ in 0..4 {
            q.enqueue(instant_task("ok"), None).await.unwrap();
        }
        let failing: TaskFn =
            Box::new(|| Box::pin(async { Err(MindError::Endpoint("500".into())) }));
        let _ = q.enqueue(failing, None).await;

        let stats = q.stats();
        assert_eq!(stats.queue_depth, 0);
        assert!((stats.success_rate - 0.8).abs() < 1e-9, "{}", stats.success_rate);
        assert!((stats.failure_rate - 0.2).abs() < 1e-9);
        // 4 successes × 15 tokens over the 60 s window.
        assert!(stats.tokens_per_second > 0.0);
        let (p, c) = q.token_totals();
        assert_eq!((p, c), (40, 20));
    }

    #[tokio::test]
    async fn coefficient_decreases_with_depth() {
        let q = ReasoningQueue::start(Duration::from_secs(60));
        let idle = q.thinking_coefficient();
        assert!((idle - 2.0).abs() < 1e-6, "idle queue should read 2.0, got {idle}");

        let mut last = idle;
        let mut handles = Vec::new();
        for _ in 0..6 {
            handles.push(q.enqueue(slow_task("slow", Duration::from_secs(60)), None));
            tokio::time::sleep(Duration::from_millis(5)).await;
            let c = q.thinking_coefficient();
            assert!(c <= last + 1e-6, "coefficient rose as depth grew");
            last = c;
        }
        assert!(last < 0.6, "deep queue should approach the floor, got {last}");
        assert!(last >= 0.25);
        q.clear();
        for h in handles {
            let _ = h.await;
        }
    }
}

// ── Decision parsing and speech validation ────────────────────────────────────

#[cfg(test)]
mod decision {
    use crate::decision::{fallback_decision, parse_decision, validate_speech};
    use crate::{MindError, TaskBrief, ThinkContext};
    use crew_agent::{GoalKind, Role};
    use crew_core::{AgentId, Vec2};

    fn ctx(name: &str) -> ThinkContext {
        ThinkContext {
            agent_id: AgentId(0),
            name: name.into(),
            role: Role::Crewmate,
            position: Vec2::ZERO,
            zone: Some("cafeteria".into()),
            visible: Vec::new(),
            can_speak_to: vec!["Blue".into()],
            tasks: vec![
                TaskBrief { task_type: "fix_wiring".into(), room: "electrical".into(), is_completed: true },
                TaskBrief { task_type: "download_data".into(), room: "comms".into(), is_completed: false },
            ],
            current_task_index: None,
            recent_events: Vec::new(),
            trigger: None,
            pending_reply: None,
            known_names: vec!["Orange".into(), "Blue".into(), "Red".into()],
        }
    }

    #[test]
    fn parses_full_response() {
        let text = "GOAL: FOLLOW_AGENT\nTARGET: Blue\nREASONING: Blue looked sus.\nTHOUGHT: Better keep an eye on Blue.";
        let d = parse_decision(text).unwrap();
        assert_eq!(d.goal, GoalKind::FollowAgent);
        assert_eq!(d.target_agent.as_deref(), Some("Blue"));
        assert_eq!(d.target_task_index, None);
        assert_eq!(d.reasoning, "Blue looked sus.");
        assert_eq!(d.thought.as_deref(), Some("Better keep an eye on Blue."));
    }

    #[test]
    fn parses_task_target_and_none() {
        let d = parse_decision("GOAL: GO_TO_TASK\nTARGET: 2\nREASONING: tasks first").unwrap();
        assert_eq!(d.goal, GoalKind::GoToTask);
        assert_eq!(d.target_task_index, Some(2));
        assert_eq!(d.target_agent, None);

        let d = parse_decision("GOAL: WANDER\nTARGET: NONE").unwrap();
        assert_eq!(d.goal, GoalKind::Wander);
        assert_eq!(d.target_agent, None);
        assert_eq!(d.target_task_index, None);
    }

    #[test]
    fn parse_is_case_and_whitespace_tolerant() {
        let d = parse_decision("  goal: wander\n  target: none\n").unwrap();
        assert_eq!(d.goal, GoalKind::Wander);
    }

    #[test]
    fn unknown_goal_is_parse_error() {
        let err = parse_decision("GOAL: DANCE\nTARGET: NONE").unwrap_err();
        assert!(matches!(err, MindError::Parse(_)));
    }

    #[test]
    fn missing_goal_is_parse_error() {
        let err = parse_decision("I think I'll just wander around.").unwrap_err();
        assert!(matches!(err, MindError::Parse(_)));
    }

    #[test]
    fn fallback_prefers_first_incomplete_task() {
        let d = fallback_decision(&ctx("Red"));
        assert_eq!(d.goal, GoalKind::GoToTask);
        assert_eq!(d.target_task_index, Some(1));
    }

    #[test]
    fn fallback_wanders_when_tasks_done() {
        let mut c = ctx("Red");
        for t in &mut c.tasks {
            t.is_completed = true;
        }
        let d = fallback_decision(&c);
        assert_eq!(d.goal, GoalKind::Wander);
    }

    #[test]
    fn speech_rewrites_third_person_self() {
        let c = ctx("Orange");
        let out = validate_speech(&c, "Orange was in medbay the whole time.").unwrap();
        assert_eq!(out, "I was in medbay the whole time.");

        let out = validate_speech(&c, "Orange is innocent!").unwrap();
        assert_eq!(out, "I am innocent!");
    }

    #[test]
    fn speech_drops_blank_responses() {
        let c = ctx("Red");
        assert_eq!(validate_speech(&c, "   "), None);
        assert_eq!(validate_speech(&c, "\"\""), None);
    }

    #[test]
    fn speech_keeps_absent_mentions() {
        // "Red" is known but not in earshot — warned about, never blocked.
        let c = ctx("Orange");
        let out = validate_speech(&c, "I saw Red vent in electrical.").unwrap();
        assert!(out.contains("Red"));
    }
}

// ── Decision service over a scripted backend ──────────────────────────────────

#[cfg(test)]
mod service {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures::future::BoxFuture;

    use crate::{
        ChatBackend, ChatOutcome, DecisionService, MindError, ReasoningQueue, TaskBrief,
        ThinkContext, Topic, Trigger, TriggerKind,
    };
    use crew_agent::{GoalKind, Role};
    use crew_core::{AgentId, Vec2};

    /// Replays a fixed reply script, then fails with `Endpoint`.
    struct Scripted {
        replies: Mutex<VecDeque<Result<&'static str, MindError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&'static str, MindError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()) })
        }
    }

    impl ChatBackend for Scripted {
        fn dispatch(
            &self,
            _system: String,
            _user: String,
            _max_tokens: u32,
        ) -> BoxFuture<'static, Result<ChatOutcome, MindError>> {
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(MindError::Endpoint("script exhausted".into())));
            Box::pin(async move {
                next.map(|text| ChatOutcome {
                    text: text.to_string(),
                    prompt_tokens: 12,
                    completion_tokens: 8,
                })
            })
        }
    }

    fn service(
        backend: Arc<dyn ChatBackend>,
    ) -> (DecisionService, tokio::sync::mpsc::UnboundedReceiver<crate::LlmTrace>) {
        let queue = ReasoningQueue::start(Duration::from_secs(5));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (DecisionService::new(queue, backend, Some(tx)), rx)
    }

    fn ctx() -> ThinkContext {
        ThinkContext {
            agent_id: AgentId(0),
            name: "Orange".into(),
            role: Role::Crewmate,
            position: Vec2::new(100.0, 100.0),
            zone: Some("cafeteria".into()),
            visible: Vec::new(),
            can_speak_to: vec!["Blue".into()],
            tasks: vec![TaskBrief {
                task_type: "fix_wiring".into(),
                room: "electrical".into(),
                is_completed: false,
            }],
            current_task_index: None,
            recent_events: Vec::new(),
            trigger: Some(Trigger::new(TriggerKind::AgentSpotted, "spotted Blue")),
            pending_reply: None,
            known_names: vec!["Orange".into(), "Blue".into()],
        }
    }

    #[tokio::test]
    async fn triggers_produce_thought_and_validated_speech() {
        let backend = Scripted::new(vec![
            Ok("  A thought about Blue. "),
            Ok("Orange was with Blue the whole time."),
        ]);
        let (svc, mut traces) = service(backend);

        let outcome = svc.process_triggers(ctx(), true, 0).await;
        assert_eq!(outcome.thought.as_deref(), Some("A thought about Blue."));
        assert_eq!(
            outcome.speech.as_deref(),
            Some("I was with Blue the whole time."),
            "speech must be rewritten to first person"
        );

        let t1 = traces.recv().await.unwrap();
        assert_eq!(t1.request_type, "thought");
        assert!(t1.success);
        assert_eq!(t1.tokens, 20);
        let t2 = traces.recv().await.unwrap();
        assert_eq!(t2.request_type, "speech");
    }

    #[tokio::test]
    async fn endpoint_failure_gives_canned_thought_and_silence() {
        let backend = Scripted::new(vec![
            Err(MindError::Endpoint("500".into())),
            Err(MindError::Endpoint("500".into())),
        ]);
        let (svc, _traces) = service(backend);

        let outcome = svc.process_triggers(ctx(), true, 0).await;
        assert!(outcome.thought.is_some(), "canned fallback thought expected");
        assert_eq!(outcome.speech, None, "failed speech must stay silent");
    }

    #[tokio::test]
    async fn decision_parses_and_traces_the_parsed_payload() {
        let backend = Scripted::new(vec![Ok(
            "GOAL: FOLLOW_AGENT\nTARGET: Blue\nREASONING: Blue looked sus.\nTHOUGHT: Watching Blue.",
        )]);
        let (svc, mut traces) = service(backend);

        let decision = svc.get_decision(ctx()).await;
        assert_eq!(decision.goal, GoalKind::FollowAgent);
        assert_eq!(decision.target_agent.as_deref(), Some("Blue"));
        assert_eq!(decision.thought.as_deref(), Some("Watching Blue."));

        let trace = traces.recv().await.unwrap();
        assert_eq!(trace.request_type, "decision");
        assert!(trace.success);
        assert!(trace.parsed_decision.is_some());
    }

    #[tokio::test]
    async fn unparseable_decision_falls_back_to_first_incomplete_task() {
        let backend = Scripted::new(vec![Ok("I guess I'll just vibe?")]);
        let (svc, _traces) = service(backend);
        let decision = svc.get_decision(ctx()).await;
        assert_eq!(decision.goal, GoalKind::GoToTask);
        assert_eq!(decision.target_task_index, Some(0));
    }

    #[tokio::test]
    async fn reply_fallbacks_follow_the_error_kind() {
        // Endpoint failure: canned reply from the topic table.
        let backend = Scripted::new(vec![Err(MindError::Endpoint("500".into()))]);
        let (svc, _t) = service(backend);
        let reply = svc
            .conversation_reply(ctx(), vec!["Blue: that was sus".into()], Topic::Suspicion, 0)
            .await;
        assert!(reply.is_some(), "endpoint failure uses the canned reply table");

        // Timeout: silence.
        let backend = Scripted::new(vec![Err(MindError::Timeout)]);
        let (svc, _t) = service(backend);
        let reply = svc
            .conversation_reply(ctx(), vec!["Blue: that was sus".into()], Topic::Suspicion, 0)
            .await;
        assert_eq!(reply, None, "timed-out replies stay silent");
    }
}

// ── Conversations ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod convo {
    use super::*;
    use crate::convo::{infer_topic, INACTIVITY_MS, RETENTION_MS};
    use crate::{CloseReason, ConversationCoordinator, ConvoError, Topic};

    fn rng() -> SimRng {
        SimRng::new(42)
    }

    #[test]
    fn start_and_alternate_to_max_turns() {
        let mut coord = ConversationCoordinator::new();
        let mut rng = rng();
        let a = AgentId(0);
        let b = AgentId(1);
        let id = coord.start_conversation(a, "Red", b, "I saw someone vent", 1_000, &mut rng);

        let convo = coord.get(id).unwrap();
        assert_eq!(convo.participants, [a, b]);
        assert!((3..=10).contains(&convo.max_turns));
        assert_eq!(convo.topic, Topic::Suspicion);

        // Alternate replies until the cap closes it.
        let max = convo.max_turns;
        let mut speaker_is_b = true;
        for turn in 1..max {
            let (speaker, name) = if speaker_is_b { (b, "Blue") } else { (a, "Red") };
            coord
                .add_reply(id, speaker, name, &format!("turn {turn}"), 1_000 + turn as u64)
                .unwrap();
            speaker_is_b = !speaker_is_b;
        }

        let convo = coord.get(id).unwrap();
        assert!(!convo.is_active);
        assert_eq!(convo.close_reason, Some(CloseReason::MaxTurnsReached));
        assert_eq!(convo.turns.len(), max);
        assert!(coord.get_active_for(a).is_none());
        assert!(coord.get_active_for(b).is_none());
    }

    #[test]
    fn second_start_resolves_to_existing() {
        let mut coord = ConversationCoordinator::new();
        let mut rng = rng();
        let id1 = coord.start_conversation(AgentId(0), "Red", AgentId(1), "hello", 0, &mut rng);
        // Same pair, either direction.
        let id2 = coord.start_conversation(AgentId(1), "Blue", AgentId(0), "hi", 5, &mut rng);
        assert_eq!(id1, id2);
        // A third agent trying to grab a busy one also resolves to it.
        let id3 = coord.start_conversation(AgentId(2), "Lime", AgentId(0), "hey", 6, &mut rng);
        assert_eq!(id1, id3);
    }

    #[test]
    fn out_of_turn_and_stranger_rejected() {
        let mut coord = ConversationCoordinator::new();
        let mut rng = rng();
        let id = coord.start_conversation(AgentId(0), "Red", AgentId(1), "hello", 0, &mut rng);

        // Initiator spoke last; they may not speak again.
        let err = coord.add_reply(id, AgentId(0), "Red", "me again", 1).unwrap_err();
        assert!(matches!(err, ConvoError::OutOfTurn { .. }));

        let err = coord.add_reply(id, AgentId(5), "Lime", "hi", 2).unwrap_err();
        assert!(matches!(err, ConvoError::NotParticipant { .. }));
    }

    #[test]
    fn inactivity_closes_then_evicts() {
        let mut coord = ConversationCoordinator::new();
        let mut rng = rng();
        let id = coord.start_conversation(AgentId(0), "Red", AgentId(1), "hello", 0, &mut rng);

        coord.tick_cleanup(INACTIVITY_MS); // exactly at the bound — still open
        assert!(coord.get(id).unwrap().is_active);

        let closed_at = INACTIVITY_MS + 1;
        coord.tick_cleanup(closed_at);
        let convo = coord.get(id).unwrap();
        assert!(!convo.is_active);
        assert_eq!(convo.close_reason, Some(CloseReason::Inactivity));

        // Lingers for display…
        coord.tick_cleanup(closed_at + RETENTION_MS);
        assert!(coord.get(id).is_some());
        // …then is evicted.
        coord.tick_cleanup(closed_at + RETENTION_MS + 1);
        assert!(coord.get(id).is_none());
    }

    #[test]
    fn pending_reply_points_at_listener() {
        let mut coord = ConversationCoordinator::new();
        let mut rng = rng();
        let a = AgentId(0);
        let b = AgentId(1);
        let id = coord.start_conversation(a, "Red", b, "you there?", 0, &mut rng);

        // B owes the reply, A does not.
        let (conv, turn) = coord.pending_reply_for(b).expect("b owes a reply");
        assert_eq!(conv, id);
        assert_eq!(turn.text, "you there?");
        assert!(coord.pending_reply_for(a).is_none());

        coord.add_reply(id, b, "Blue", "here", 10).unwrap();
        let convo = coord.get(id).unwrap();
        if convo.is_active {
            let (_, turn) = coord.pending_reply_for(a).expect("now a owes a reply");
            assert_eq!(turn.text, "here");
        }
    }

    #[test]
    fn participant_sets_disjoint_across_conversations() {
        let mut coord = ConversationCoordinator::new();
        let mut rng = rng();
        let id1 = coord.start_conversation(AgentId(0), "Red", AgentId(1), "a", 0, &mut rng);
        let id2 = coord.start_conversation(AgentId(2), "Lime", AgentId(3), "b", 0, &mut rng);
        assert_ne!(id1, id2);
        let c1 = coord.get(id1).unwrap();
        let c2 = coord.get(id2).unwrap();
        assert!(!c1.participants.iter().any(|p| c2.participants.contains(p)));
        assert_eq!(coord.active_count(), 2);
    }

    #[test]
    fn topic_inference_keywords() {
        assert_eq!(infer_topic("That vent move was suspicious"), Topic::Suspicion);
        assert_eq!(infer_topic("I was in medbay, ask Green"), Topic::Alibi);
        assert_eq!(infer_topic("My last task is the wiring"), Topic::TaskInfo);
        assert_eq!(infer_topic("It was you, I saw you do it"), Topic::Accusation);
        assert_eq!(infer_topic("It wasn't me, I swear"), Topic::Defense);
        assert_eq!(infer_topic("Nice weather on the ship today"), Topic::SmallTalk);
    }
}
