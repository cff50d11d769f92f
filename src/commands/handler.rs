use std::sync::Arc;

use tracing::{debug, warn};

use crate::common::types::{ChannelId, TrackId};
use crate::protocol::events::PushEvent;
use crate::protocol::tracks;
use crate::rtm::Outbox;
use crate::server::AppState;

use super::{Command, CommandParser, HELP_REPLY, NO_TRACKS_REPLY, ParseOutcome};

/// Interprets inbound chat messages and applies them to channel queues.
///
/// Dispatch itself never blocks the gateway loop: queue mutations are
/// in-memory, and the two lookup commands run as spawned tasks that carry
/// their own reply handle.
pub struct CommandHandler {
    state: Arc<AppState>,
    parser: CommandParser,
}

impl CommandHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        let parser = CommandParser::new(&state.config.chat.trigger);
        Self { state, parser }
    }

    /// Entry point for every inbound chat message.
    pub fn handle_message(&self, outbox: &Outbox, channel: &ChannelId, text: &str) {
        match self.parser.parse(text) {
            ParseOutcome::Ignored => {}
            ParseOutcome::Rejected(reply) => outbox.send(channel, reply),
            ParseOutcome::Command(command) => self.dispatch(outbox, channel, command),
        }
    }

    fn dispatch(&self, outbox: &Outbox, channel: &ChannelId, command: Command) {
        debug!("Dispatching {} on channel {}", command.name(), channel);

        // Every validated command materializes the channel's queue state.
        self.state.channel(channel);

        match command {
            Command::List => {
                let reply = {
                    let queue = self.state.channel(channel);
                    if queue.is_empty() {
                        NO_TRACKS_REPLY.to_string()
                    } else {
                        tracks::render_numbered(queue.tracks())
                    }
                };
                outbox.send(channel, reply);
            }
            Command::Help => outbox.send(channel, HELP_REPLY),
            Command::Play => {
                self.state.channel(channel).play();
                self.state.touch(channel);
                outbox.send(channel, "Playback started");
                self.state.broadcaster.broadcast(&PushEvent::Play);
            }
            Command::Pause => {
                self.state.channel(channel).pause();
                self.state.touch(channel);
                outbox.send(channel, "Playback paused");
                self.state.broadcaster.broadcast(&PushEvent::Pause);
            }
            Command::Stop => {
                self.state.channel(channel).stop();
                self.state.touch(channel);
                outbox.send(channel, "Playback stopped");
            }
            Command::Next => {
                let current = self.state.channel(channel).advance().cloned();
                self.state.touch(channel);

                let reply = match &current {
                    Some(track) => format!("Track skipped. Next track: {}", track.label()),
                    None => NO_TRACKS_REPLY.to_string(),
                };
                outbox.send(channel, reply);
                self.state
                    .broadcaster
                    .broadcast(&PushEvent::Next { track: current });
            }
            Command::Remove { data } => {
                let removed = {
                    let mut queue = self.state.channel(channel);
                    data.parse::<u64>()
                        .ok()
                        .and_then(|id| queue.remove_by_id(TrackId(id)))
                };

                match removed {
                    Some(track) => {
                        self.state.touch(channel);
                        outbox.send(
                            channel,
                            format!("{} has been removed from the queue", track.label()),
                        );
                    }
                    None => outbox.send(
                        channel,
                        format!("Sorry, {data} has not been found in the queue"),
                    ),
                }
            }
            Command::Find { query } => self.spawn_find(outbox, channel, query),
            Command::Add { query } => self.spawn_add(outbox, channel, query),
        }
    }

    /// The search runs off the gateway loop; the reply lands whenever the
    /// lookup resolves.
    fn spawn_find(&self, outbox: &Outbox, channel: &ChannelId, query: String) {
        let state = Arc::clone(&self.state);
        let outbox = outbox.clone();
        let channel = channel.clone();

        tokio::spawn(async move {
            let reply = match state.source.search(&query).await {
                Ok(tracks) if tracks.is_empty() => {
                    format!("Sorry, no tracks found for {query}")
                }
                Ok(tracks) => tracks::render_numbered(&tracks),
                Err(e) => {
                    warn!("Track search for {:?} failed: {}", query, e);
                    format!("Sorry, the track lookup failed for {query}")
                }
            };
            outbox.send(&channel, reply);
        });
    }

    fn spawn_add(&self, outbox: &Outbox, channel: &ChannelId, query: String) {
        let state = Arc::clone(&self.state);
        let outbox = outbox.clone();
        let channel = channel.clone();

        tokio::spawn(async move {
            // A bare numeric payload is the track id that `find` and `list`
            // print in backticks; anything else is a search query.
            let lookup = match query.parse::<u64>() {
                Ok(id) => state.source.track(TrackId(id)).await,
                Err(_) => state
                    .source
                    .search(&query)
                    .await
                    .map(|tracks| tracks.into_iter().next()),
            };

            let found = match lookup {
                Ok(found) => found,
                Err(e) => {
                    warn!("Track lookup for {:?} failed: {}", query, e);
                    outbox.send(&channel, format!("Sorry, the track lookup failed for {query}"));
                    return;
                }
            };

            let Some(track) = found else {
                outbox.send(&channel, format!("Sorry, no tracks found for {query}"));
                return;
            };

            let label = track.label();

            // The idle check and the mutation share one entry guard, so two
            // racing adds cannot both claim an idle channel.
            let streamed = {
                let mut queue = state.channel(&channel);
                if queue.current().is_none() {
                    queue.load_current(track.clone());
                    Some(track)
                } else {
                    queue.enqueue(track);
                    None
                }
            };
            state.touch(&channel);

            match streamed {
                Some(track) => {
                    outbox.send(&channel, format!("Now streaming {label}"));
                    state
                        .broadcaster
                        .broadcast(&PushEvent::Stream { track });
                }
                None => outbox.send(&channel, format!("{label} has been added to the queue")),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    use async_trait::async_trait;
    use tokio_tungstenite::tungstenite::protocol::Message;

    use crate::common::errors::LookupError;
    use crate::config::Config;
    use crate::protocol::tracks::{Track, TrackUser};
    use crate::queue::Playback;
    use crate::sources::TrackSource;

    struct StaticSource {
        tracks: Vec<Track>,
        fail: bool,
    }

    #[async_trait]
    impl TrackSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn search(&self, _query: &str) -> Result<Vec<Track>, LookupError> {
            if self.fail {
                return Err(LookupError::Status(500));
            }
            Ok(self.tracks.clone())
        }

        async fn track(&self, id: TrackId) -> Result<Option<Track>, LookupError> {
            if self.fail {
                return Err(LookupError::Status(500));
            }
            Ok(self.tracks.iter().find(|t| t.id == id).cloned())
        }
    }

    fn track(id: u64, title: &str) -> Track {
        Track {
            id: TrackId(id),
            title: title.to_string(),
            user: TrackUser {
                username: "daftpunk".to_string(),
            },
        }
    }

    struct Fixture {
        handler: CommandHandler,
        state: Arc<AppState>,
        outbox: Outbox,
        rx: tokio::sync::mpsc::UnboundedReceiver<Message>,
        channel: ChannelId,
    }

    fn fixture(tracks: Vec<Track>) -> Fixture {
        fixture_with(StaticSource {
            tracks,
            fail: false,
        })
    }

    fn fixture_with(source: StaticSource) -> Fixture {
        let state = Arc::new(AppState::new(Config::default(), Arc::new(source)));
        let handler = CommandHandler::new(state.clone());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let outbox = Outbox::new(tx, Arc::new(AtomicU64::new(1)));
        Fixture {
            handler,
            state,
            outbox,
            rx,
            channel: ChannelId::from("C024BE91L"),
        }
    }

    impl Fixture {
        fn send(&self, text: &str) {
            self.handler
                .handle_message(&self.outbox, &self.channel, text);
        }

        fn reply_now(&mut self) -> String {
            let msg = self.rx.try_recv().expect("a reply should be queued");
            reply_text(msg)
        }

        async fn reply(&mut self) -> String {
            let msg = self.rx.recv().await.expect("a reply should arrive");
            reply_text(msg)
        }
    }

    fn reply_text(msg: Message) -> String {
        let Message::Text(text) = msg else {
            panic!("expected a text frame")
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "message");
        value["text"].as_str().unwrap().to_string()
    }

    fn push_json(msg: axum::extract::ws::Message) -> serde_json::Value {
        let axum::extract::ws::Message::Text(text) = msg else {
            panic!("expected a text frame")
        };
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_untriggered_messages_are_ignored() {
        let mut fx = fixture(vec![]);
        fx.send("what a day");

        assert!(fx.rx.try_recv().is_err());
        assert!(fx.state.channels.is_empty());
    }

    #[test]
    fn test_unrecognized_command_replies_and_never_mutates() {
        let mut fx = fixture(vec![]);
        fx.send("J dance");

        assert_eq!(fx.reply_now(), "Sorry mate, incorrect command. Peace.");
        assert!(fx.state.channels.is_empty());
    }

    #[test]
    fn test_missing_data_reply_names_the_command() {
        let mut fx = fixture(vec![]);
        fx.send("J add");

        assert_eq!(
            fx.reply_now(),
            "Got your command (add), but you didn't specify data mate!"
        );
    }

    #[test]
    fn test_list_on_a_fresh_channel_is_empty() {
        let mut fx = fixture(vec![]);
        fx.send("J list");

        assert_eq!(fx.reply_now(), "No tracks in a queue");
        assert_eq!(fx.state.channels.len(), 1);
    }

    #[test]
    fn test_play_pause_stop_drive_playback() {
        let mut fx = fixture(vec![]);
        let (_id, push_rx) = fx.state.broadcaster.subscribe();

        fx.send("J play");
        assert_eq!(fx.reply_now(), "Playback started");
        assert_eq!(fx.state.channel(&fx.channel).playback(), Playback::Playing);
        assert_eq!(push_json(push_rx.try_recv().unwrap())["op"], "play");

        fx.send("J pause");
        assert_eq!(fx.reply_now(), "Playback paused");
        assert_eq!(fx.state.channel(&fx.channel).playback(), Playback::Paused);
        assert_eq!(push_json(push_rx.try_recv().unwrap())["op"], "pause");

        fx.send("J stop");
        assert_eq!(fx.reply_now(), "Playback stopped");
        assert_eq!(fx.state.channel(&fx.channel).playback(), Playback::Stopped);
        // Stop is not mirrored to browsers.
        assert!(push_rx.try_recv().is_err());
    }

    #[test]
    fn test_next_on_an_empty_channel_clears_current() {
        let mut fx = fixture(vec![]);
        let (_id, push_rx) = fx.state.broadcaster.subscribe();

        fx.send("J next");

        assert_eq!(fx.reply_now(), "No tracks in a queue");
        let event = push_json(push_rx.try_recv().unwrap());
        assert_eq!(event["op"], "next");
        assert!(event["track"].is_null());
    }

    #[test]
    fn test_next_pops_the_head_and_broadcasts_it() {
        let mut fx = fixture(vec![]);
        fx.state.channel(&fx.channel).enqueue(track(42, "One More Time"));
        let (_id, push_rx) = fx.state.broadcaster.subscribe();

        fx.send("J skip");

        assert_eq!(
            fx.reply_now(),
            "Track skipped. Next track: daftpunk — One More Time `42`"
        );
        let event = push_json(push_rx.try_recv().unwrap());
        assert_eq!(event["op"], "next");
        assert_eq!(event["track"]["id"], 42);

        let queue = fx.state.channel(&fx.channel);
        assert!(queue.is_empty());
        assert_eq!(queue.current().unwrap().id, TrackId(42));
    }

    #[tokio::test]
    async fn test_add_bypasses_an_idle_channel() {
        let mut fx = fixture(vec![track(42, "One More Time")]);
        let (_id, push_rx) = fx.state.broadcaster.subscribe();

        fx.send("J add Daft Punk");

        assert_eq!(
            fx.reply().await,
            "Now streaming daftpunk — One More Time `42`"
        );
        let event = push_json(push_rx.try_recv().unwrap());
        assert_eq!(event["op"], "stream");
        assert_eq!(event["track"]["title"], "One More Time");

        let queue = fx.state.channel(&fx.channel);
        assert!(queue.is_empty());
        assert_eq!(queue.current().unwrap().id, TrackId(42));
        drop(queue);
        assert_eq!(fx.state.active(), Some(fx.channel.clone()));

        // The bypassed track never reaches the queue listing.
        fx.send("J list");
        assert_eq!(fx.reply().await, "No tracks in a queue");
    }

    #[tokio::test]
    async fn test_second_add_appends_instead_of_streaming() {
        let mut fx = fixture(vec![track(42, "One More Time")]);

        fx.send("J add Daft Punk");
        fx.reply().await;

        fx.send("J add Daft Punk");
        assert_eq!(
            fx.reply().await,
            "daftpunk — One More Time `42` has been added to the queue"
        );

        fx.send("J list");
        assert_eq!(fx.reply().await, "1. daftpunk — One More Time `42`");
    }

    #[tokio::test]
    async fn test_add_with_a_numeric_id_fetches_that_track() {
        // Search would return track 42 first; the id form must resolve 43.
        let mut fx = fixture(vec![track(42, "One More Time"), track(43, "Aerodynamic")]);

        fx.send("J add 43");

        assert_eq!(fx.reply().await, "Now streaming daftpunk — Aerodynamic `43`");
        assert_eq!(
            fx.state.channel(&fx.channel).current().unwrap().id,
            TrackId(43)
        );
    }

    #[tokio::test]
    async fn test_add_with_an_unknown_id_reports_not_found() {
        let mut fx = fixture(vec![track(42, "One More Time")]);

        fx.send("J add 99");

        assert_eq!(fx.reply().await, "Sorry, no tracks found for 99");
        let queue = fx.state.channel(&fx.channel);
        assert!(queue.is_empty());
        assert!(queue.current().is_none());
    }

    #[tokio::test]
    async fn test_add_id_lookup_failure_names_the_id() {
        let mut fx = fixture_with(StaticSource {
            tracks: vec![],
            fail: true,
        });

        fx.send("J add 42");

        assert_eq!(fx.reply().await, "Sorry, the track lookup failed for 42");
    }

    #[tokio::test]
    async fn test_add_with_no_matches_queues_nothing() {
        let mut fx = fixture(vec![]);

        fx.send("J add something obscure");

        assert_eq!(fx.reply().await, "Sorry, no tracks found for something obscure");
        let queue = fx.state.channel(&fx.channel);
        assert!(queue.is_empty());
        assert!(queue.current().is_none());
    }

    #[tokio::test]
    async fn test_add_lookup_failure_names_the_query() {
        let mut fx = fixture_with(StaticSource {
            tracks: vec![],
            fail: true,
        });

        fx.send("J add Daft Punk");

        assert_eq!(
            fx.reply().await,
            "Sorry, the track lookup failed for Daft Punk"
        );
        assert!(fx.state.channel(&fx.channel).is_empty());
    }

    #[tokio::test]
    async fn test_find_renders_numbered_results() {
        let mut fx = fixture(vec![
            track(42, "One More Time"),
            track(43, "Aerodynamic"),
        ]);

        fx.send("J find daft");

        assert_eq!(
            fx.reply().await,
            "1. daftpunk — One More Time `42`\n2. daftpunk — Aerodynamic `43`"
        );
        // A search materializes the channel but queues nothing.
        let queue = fx.state.channel(&fx.channel);
        assert!(queue.is_empty());
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_remove_hits_and_misses() {
        let mut fx = fixture(vec![]);
        {
            let mut queue = fx.state.channel(&fx.channel);
            queue.enqueue(track(42, "One More Time"));
            queue.enqueue(track(43, "Aerodynamic"));
        }

        fx.send("J remove 42");
        assert_eq!(
            fx.reply_now(),
            "daftpunk — One More Time `42` has been removed from the queue"
        );

        fx.send("J remove 42");
        assert_eq!(fx.reply_now(), "Sorry, 42 has not been found in the queue");

        // Non-numeric data never matches anything.
        fx.send("J remove pizza");
        assert_eq!(
            fx.reply_now(),
            "Sorry, pizza has not been found in the queue"
        );

        assert_eq!(fx.state.channel(&fx.channel).len(), 1);
    }

    #[test]
    fn test_channels_hold_independent_queues() {
        let mut fx = fixture(vec![]);
        let other = ChannelId::from("C222TEAM");
        fx.state.channel(&fx.channel).enqueue(track(42, "One More Time"));
        fx.state.channel(&other).enqueue(track(43, "Aerodynamic"));

        fx.send("J play");
        assert_eq!(fx.reply_now(), "Playback started");
        fx.send("J next");
        assert_eq!(
            fx.reply_now(),
            "Track skipped. Next track: daftpunk — One More Time `42`"
        );

        // Draining one channel leaves the other's queue and playback alone.
        fx.send("J list");
        assert_eq!(fx.reply_now(), "No tracks in a queue");
        fx.handler.handle_message(&fx.outbox, &other, "J list");
        assert_eq!(fx.reply_now(), "1. daftpunk — Aerodynamic `43`");

        let untouched = fx.state.channel(&other);
        assert_eq!(untouched.len(), 1);
        assert!(untouched.current().is_none());
        assert_eq!(untouched.playback(), Playback::Stopped);
    }

    #[test]
    fn test_help_lists_the_commands() {
        let mut fx = fixture(vec![]);
        fx.send("J help");

        let reply = fx.reply_now();
        for name in ["list", "find", "add", "remove", "play", "pause", "stop", "next"] {
            assert!(reply.contains(name), "help should mention {name}");
        }
    }
}
