use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Notify};

use crate::{
	coding::{self, Reader},
	ietf::{
		self, ClientSetup, Control, ControlMessage, Message, RawMessage, ServerSetup, SubscribeId, TrackNamespace,
		Version,
	},
	Error, Event, GroupSnapshot, Handshake, HandshakeState, NoopStats, SessionConfig, SetupError, Stage, Stats,
	StreamId, SubscribeOptions, Subscriber, Subscription, SubscriptionStatus, Transport,
};

/// The state of one connection, mutated only while the session lock is held.
struct Connection<T: Transport> {
	transport: T,
	config: SessionConfig,
	stats: Arc<dyn Stats>,
	handshake: Handshake,

	// The stream carrying the WebTransport CONNECT request.
	session_stream: Option<StreamId>,

	control: Option<Control>,
	control_reader: Reader<Version>,

	version: Option<Version>,
	server_setup: Option<ServerSetup>,

	subscriber: Subscriber,

	// Both start at 1.
	next_id: SubscribeId,
	next_alias: u64,

	// Only enforced once the server advertises a limit.
	max_subscribe_id: Option<u64>,

	error: Option<Error>,
}

impl<T: Transport> Connection<T> {
	fn new(transport: T, config: SessionConfig, stats: Arc<dyn Stats>) -> Self {
		let version = config.versions.first().copied().unwrap_or(Version::Draft07);

		Self {
			transport,
			config,
			stats,
			handshake: Handshake::new(),
			session_stream: None,
			control: None,
			control_reader: Reader::new(version),
			version: None,
			server_setup: None,
			subscriber: Subscriber::new(version),
			next_id: SubscribeId(1),
			next_alias: 1,
			max_subscribe_id: None,
			error: None,
		}
	}

	/// Send the WebTransport CONNECT request.
	fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
		if let Some(err) = &self.error {
			return Err(err.clone());
		}

		let state = self.handshake.state();
		if state != HandshakeState::Idle {
			return Err(Error::NotReady(state));
		}

		let headers: Vec<(String, String)> = [
			(":method", "CONNECT".to_string()),
			(":protocol", "webtransport".to_string()),
			(":scheme", "https".to_string()),
			(":authority", format!("{host}:{port}")),
			(":path", self.config.path.clone()),
			("sec-webtransport-http3-draft", "draft02".to_string()),
			("user-agent", self.config.user_agent.clone()),
		]
		.into_iter()
		.map(|(name, value)| (name.to_string(), value))
		.collect();

		let stream = self.transport.send_request(&headers).map_err(Error::transport)?;
		self.transport.flush().map_err(Error::transport)?;

		tracing::info!(%host, port, %stream, "requested webtransport session");

		self.session_stream = Some(stream);
		self.handshake.advance(HandshakeState::WebTransportRequested)
	}

	/// Open the control stream and send CLIENT_SETUP.
	fn setup(&mut self) -> Result<(), Error> {
		if let Some(err) = &self.error {
			return Err(err.clone());
		}

		let state = self.handshake.state();
		let session = match (&state, self.session_stream) {
			(HandshakeState::WebTransportEstablished, Some(session)) => session,
			_ => return Err(Error::NotReady(state)),
		};

		let stream = self.transport.open_bi(session).map_err(Error::transport)?;
		let control = Control::new(stream, self.control_reader_version());

		let versions: Vec<coding::Version> = self.config.versions.iter().copied().map(coding::Version::from).collect();
		let mut client = ClientSetup::new(versions);
		if let Some(role) = self.config.role {
			client = client.with_role(role)?;
		}

		control.send(&mut self.transport, self.stats.as_ref(), &client)?;
		self.control = Some(control);

		self.handshake.advance(HandshakeState::ClientSetupSent)
	}

	fn control_reader_version(&self) -> Version {
		self.version.unwrap_or(self.config.versions.first().copied().unwrap_or(Version::Draft07))
	}

	fn handle_event(&mut self, event: Event) -> Result<(), Error> {
		if let Some(err) = &self.error {
			tracing::trace!(?event, %err, "ignoring event after failure");
			return Ok(());
		}

		match event {
			Event::Headers { stream_id, headers } => self.recv_headers(stream_id, headers),
			Event::StreamData { stream_id, data, fin } => {
				if self.control.map(|control| control.stream()) == Some(stream_id) {
					self.recv_control(data, fin)
				} else if self.session_stream == Some(stream_id) {
					match fin {
						true => Err(Error::Connection {
							code: 0,
							reason: "webtransport session closed".to_string(),
						}),
						false => Ok(()),
					}
				} else {
					self.subscriber.recv_stream(stream_id, &data, fin, self.stats.as_ref());
					Ok(())
				}
			}
			Event::ConnectionError { code, reason } => {
				tracing::warn!(code, %reason, "connection error");
				Err(Error::Connection { code, reason })
			}
		}
	}

	fn recv_headers(&mut self, stream_id: StreamId, headers: Vec<(String, String)>) -> Result<(), Error> {
		if self.session_stream != Some(stream_id) {
			tracing::debug!(stream = %stream_id, "ignoring headers for unknown stream");
			return Ok(());
		}

		let state = self.handshake.state();
		if state != HandshakeState::WebTransportRequested {
			tracing::warn!(?state, "ignoring duplicate response headers");
			return Ok(());
		}

		let status = headers
			.iter()
			.find(|(name, _)| name == ":status")
			.map(|(_, value)| value.as_str());

		match status {
			Some("200") => {
				tracing::info!("webtransport session established");
				self.handshake.advance(HandshakeState::WebTransportEstablished)
			}
			Some(status) => Err(SetupError::Status(status.to_string()).into()),
			None => Err(SetupError::Status("missing".to_string()).into()),
		}
	}

	fn recv_control(&mut self, data: Bytes, fin: bool) -> Result<(), Error> {
		self.control_reader.push(&data);

		loop {
			let raw = match self.control_reader.decode::<RawMessage>() {
				Ok(Some(raw)) => raw,
				Ok(None) => break,
				Err(err) => {
					// The framing itself is broken, so there's no way to find the next message.
					tracing::warn!(%err, size = self.control_reader.len(), "discarding control stream buffer");
					self.control_reader.read_all();
					break;
				}
			};

			tracing::trace!(id = raw.id, size = raw.length(), hex = %hex::encode(&raw.payload), "received control message");
			self.recv_message(raw)?;
		}

		if fin {
			return Err(Error::Connection {
				code: 0,
				reason: "control stream closed".to_string(),
			});
		}

		Ok(())
	}

	fn recv_message(&mut self, raw: RawMessage) -> Result<(), Error> {
		let state = self.handshake.state();
		let id = raw.id;

		let msg = match raw.parse(self.control_reader_version()) {
			Ok(msg) => msg,
			Err(err) if id == ServerSetup::ID && state == HandshakeState::ClientSetupSent => {
				return Err(SetupError::Decode(err).into());
			}
			Err(err) => {
				tracing::warn!(id, %err, "dropping malformed control message");
				return Ok(());
			}
		};

		tracing::debug!(message = ?msg, "received control message");

		match msg {
			ControlMessage::ServerSetup(setup) => self.recv_server_setup(setup),
			ControlMessage::Unknown { id, .. } => {
				tracing::warn!(id, "skipping unknown control message");
				Ok(())
			}
			msg if !state.is_established() => Err(SetupError::Unexpected(msg.id()).into()),
			ControlMessage::SubscribeOk(msg) => {
				self.subscriber.recv_subscribe_ok(msg);
				Ok(())
			}
			ControlMessage::SubscribeError(msg) => {
				self.subscriber.recv_subscribe_error(msg);
				Ok(())
			}
			ControlMessage::SubscribeDone(msg) => {
				self.subscriber.recv_subscribe_done(msg);
				Ok(())
			}
			ControlMessage::MaxSubscribeId(msg) => {
				self.recv_max_subscribe_id(msg);
				Ok(())
			}
			msg @ (ControlMessage::ClientSetup(_) | ControlMessage::Subscribe(_) | ControlMessage::Unsubscribe(_)) => {
				tracing::warn!(id = msg.id(), "ignoring publisher message");
				Ok(())
			}
		}
	}

	fn recv_server_setup(&mut self, setup: ServerSetup) -> Result<(), Error> {
		let state = self.handshake.state();
		if state != HandshakeState::ClientSetupSent {
			return Err(SetupError::Unexpected(ServerSetup::ID).into());
		}

		let version = Version::try_from(setup.version)
			.ok()
			.filter(|version| self.config.versions.contains(version))
			.ok_or(SetupError::Version(setup.version))?;

		self.max_subscribe_id = setup.max_subscribe_id().map_err(SetupError::Decode)?;
		self.version = Some(version);

		tracing::info!(?version, max_subscribe_id = ?self.max_subscribe_id, "moqt session established");

		self.server_setup = Some(setup);
		self.handshake.advance(HandshakeState::MoqtEstablished)
	}

	fn recv_max_subscribe_id(&mut self, msg: ietf::MaxSubscribeId) {
		match self.max_subscribe_id {
			Some(max) if msg.id.0 <= max => {
				tracing::warn!(max, new = %msg.id, "MAX_SUBSCRIBE_ID did not increase");
			}
			_ => self.max_subscribe_id = Some(msg.id.0),
		}
	}

	fn ready(&self) -> Result<Control, Error> {
		if let Some(err) = &self.error {
			return Err(err.clone());
		}

		let state = self.handshake.state();
		match (state.is_established(), self.control) {
			(true, Some(control)) => Ok(control),
			_ => Err(Error::NotReady(state)),
		}
	}

	fn subscribe(
		&mut self,
		track_namespace: TrackNamespace,
		track_name: Bytes,
		options: SubscribeOptions,
	) -> Result<Subscription, Error> {
		let control = self.ready()?;

		if let Some(max) = self.max_subscribe_id {
			if self.next_id.0 >= max {
				tracing::warn!(id = %self.next_id, max, "too many subscribes");
				return Err(Error::TooManySubscribes);
			}
		}

		let msg = ietf::Subscribe {
			id: self.next_id,
			track_alias: self.next_alias,
			track_namespace,
			track_name,
			subscriber_priority: options.priority,
			group_order: options.group_order,
			filter_type: options.filter_type,
			start: options.start,
			end: options.end,
			parameters: Default::default(),
		};

		let subscription = self
			.subscriber
			.subscribe(control, &mut self.transport, self.stats.as_ref(), msg)?;

		self.next_id.increment();
		self.next_alias += 1;

		Ok(subscription)
	}

	fn unsubscribe(&mut self, id: SubscribeId) -> Result<(), Error> {
		let control = self.ready()?;
		self.subscriber
			.unsubscribe(control, &mut self.transport, self.stats.as_ref(), id)
	}

	/// Record the first fatal error and fail the handshake.
	fn fail(&mut self, err: Error) {
		if self.error.is_some() {
			return;
		}

		tracing::warn!(%err, "session failed");
		self.handshake.fail(err.to_string());
		self.subscriber.close();
		self.error = Some(err);
	}
}

/// A MoQ subscriber session over a caller-provided [Transport].
///
/// Transport events are fed in order through [Session::handle_event], or by [Session::run] from a channel.
/// All state lives behind one lock per session, so the session can be cloned and shared between tasks.
pub struct Session<T: Transport> {
	conn: Arc<Mutex<Connection<T>>>,
	state: watch::Receiver<HandshakeState>,

	// Woken whenever an event was processed.
	changed: Arc<Notify>,
	config: Arc<SessionConfig>,
}

impl<T: Transport> Clone for Session<T> {
	fn clone(&self) -> Self {
		Self {
			conn: self.conn.clone(),
			state: self.state.clone(),
			changed: self.changed.clone(),
			config: self.config.clone(),
		}
	}
}

impl<T: Transport> Session<T> {
	pub fn new(transport: T, config: SessionConfig) -> Self {
		Self::with_stats(transport, config, Arc::new(NoopStats))
	}

	/// Create a session that reports byte counts to the given [Stats].
	pub fn with_stats(transport: T, config: SessionConfig, stats: Arc<dyn Stats>) -> Self {
		let conn = Connection::new(transport, config.clone(), stats);
		let state = conn.handshake.subscribe();

		Self {
			conn: Arc::new(Mutex::new(conn)),
			state,
			changed: Arc::new(Notify::new()),
			config: Arc::new(config),
		}
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Process a single transport event to completion.
	///
	/// Malformed messages and objects are logged and dropped. Only errors that fail the session are returned.
	pub fn handle_event(&self, event: Event) -> Result<(), Error> {
		let res = {
			let mut conn = self.conn.lock();
			let res = conn.handle_event(event);

			match res {
				Err(err) if err.is_fatal() => {
					conn.fail(err.clone());
					Err(err)
				}
				Err(err) => {
					tracing::warn!(%err, "dropping event");
					Ok(())
				}
				Ok(()) => Ok(()),
			}
		};

		self.changed.notify_waiters();
		res
	}

	/// Establish the WebTransport session and perform the MoQ setup.
	///
	/// `timeout` bounds the WebTransport handshake, [SessionConfig::setup_timeout] bounds the wait for SERVER_SETUP.
	pub async fn initialize(&self, host: &str, port: u16, timeout: Duration) -> Result<(), Error> {
		let res = self.conn.lock().connect(host, port);
		self.check(res)?;

		self.wait_for(HandshakeState::WebTransportEstablished, timeout, Stage::WebTransport)
			.await?;

		let res = self.conn.lock().setup();
		self.check(res)?;

		self.wait_for(HandshakeState::MoqtEstablished, self.config.setup_timeout, Stage::Setup)
			.await
	}

	async fn wait_for(&self, target: HandshakeState, timeout: Duration, stage: Stage) -> Result<(), Error> {
		let mut state = self.state.clone();
		let res = tokio::time::timeout(timeout, state.wait_for(|s| s.is_failed() || s.has_reached(&target))).await;

		let failed = match res {
			Ok(Ok(state)) => state.is_failed(),
			Ok(Err(_)) => return Err(Error::Closed),
			Err(_) => {
				tracing::warn!(?target, ?timeout, "timed out waiting for {stage}");
				return Err(self.fail(Error::Timeout(stage)));
			}
		};

		match failed {
			true => Err(self.error()),
			false => Ok(()),
		}
	}

	// Fail the session on fatal errors returned by the API.
	fn check(&self, res: Result<(), Error>) -> Result<(), Error> {
		match res {
			Err(err) if err.is_fatal() => Err(self.fail(err)),
			res => res,
		}
	}

	fn fail(&self, err: Error) -> Error {
		self.conn.lock().fail(err.clone());
		self.changed.notify_waiters();
		err
	}

	/// The error that failed the session, or [Error::Closed].
	pub fn error(&self) -> Error {
		self.conn.lock().error.clone().unwrap_or(Error::Closed)
	}

	/// Subscribe to a track using the default options.
	pub fn subscribe(&self, namespace: impl Into<TrackNamespace>, track: impl Into<Bytes>) -> Result<Subscription, Error> {
		self.subscribe_with(namespace, track, self.config.subscribe.clone())
	}

	/// Send SUBSCRIBE and return immediately; the reply is observed with [Session::subscribed].
	pub fn subscribe_with(
		&self,
		namespace: impl Into<TrackNamespace>,
		track: impl Into<Bytes>,
		options: SubscribeOptions,
	) -> Result<Subscription, Error> {
		let res = self.conn.lock().subscribe(namespace.into(), track.into(), options);
		self.check_subscription(res)
	}

	/// Send UNSUBSCRIBE. The subscription becomes Done when the publisher replies with SUBSCRIBE_DONE.
	pub fn unsubscribe(&self, id: SubscribeId) -> Result<(), Error> {
		let res = self.conn.lock().unsubscribe(id);
		self.check(res)
	}

	fn check_subscription(&self, res: Result<Subscription, Error>) -> Result<Subscription, Error> {
		match res {
			Err(err) if err.is_fatal() => Err(self.fail(err)),
			res => res,
		}
	}

	pub fn state(&self) -> HandshakeState {
		self.state.borrow().clone()
	}

	pub fn subscription(&self, id: SubscribeId) -> Option<Subscription> {
		self.conn.lock().subscriber.get(id).cloned()
	}

	/// A snapshot of the objects received per group.
	pub fn groups(&self) -> BTreeMap<u64, GroupSnapshot> {
		self.conn.lock().subscriber.groups()
	}

	/// The parameters from SERVER_SETUP, once received.
	pub fn server_parameters(&self) -> Option<ietf::Parameters> {
		self.conn.lock().server_setup.as_ref().map(|setup| setup.parameters.clone())
	}

	/// The version selected by the server.
	pub fn version(&self) -> Option<Version> {
		self.conn.lock().version
	}

	/// Wait for SUBSCRIBE_OK, returning the publisher's error if rejected.
	pub async fn subscribed(&self, id: SubscribeId, timeout: Duration) -> Result<Subscription, Error> {
		let subscription = self
			.wait_subscription(id, timeout, Stage::Subscribe, |status| status.is_resolved())
			.await?;

		match subscription.status {
			SubscriptionStatus::Error { code, reason, .. } => Err(Error::Subscribe {
				code: code.into(),
				reason,
			}),
			_ => Ok(subscription),
		}
	}

	/// Wait until no more objects will arrive for the subscription.
	pub async fn subscribe_done(&self, id: SubscribeId, timeout: Duration) -> Result<Subscription, Error> {
		self.wait_subscription(id, timeout, Stage::SubscribeDone, |status| status.is_closed())
			.await
	}

	async fn wait_subscription<F>(&self, id: SubscribeId, timeout: Duration, stage: Stage, f: F) -> Result<Subscription, Error>
	where
		F: Fn(&SubscriptionStatus) -> bool,
	{
		let deadline = tokio::time::Instant::now() + timeout;

		loop {
			let notified = {
				let conn = self.conn.lock();
				let subscription = conn.subscriber.get(id).ok_or(Error::NotFound)?;

				if f(&subscription.status) {
					return Ok(subscription.clone());
				}

				if let Some(err) = &conn.error {
					return Err(err.clone());
				}

				// Registered before the lock is released, so no wakeup is missed.
				self.changed.clone().notified_owned()
			};

			if tokio::time::timeout_at(deadline, notified).await.is_err() {
				return Err(Error::Timeout(stage));
			}
		}
	}

	/// Close the session, releasing every subscription.
	pub fn close(&self) {
		self.fail(Error::Closed);
	}

	/// Process events until the channel closes or the session fails.
	pub async fn run(&self, mut events: mpsc::UnboundedReceiver<Event>) -> Result<(), Error> {
		while let Some(event) = events.recv().await {
			self.handle_event(event)?;
		}

		tracing::debug!("transport event channel closed");
		Err(self.fail(Error::Closed))
	}

	/// Spawn [Session::run] in the background.
	pub fn start(&self, events: mpsc::UnboundedReceiver<Event>) {
		let session = self.clone();

		web_async::spawn(async move {
			if let Err(err) = session.run(events).await {
				tracing::debug!(%err, "session terminated");
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		coding::Encode,
		ietf::{
			encode_message, FilterType, GroupOrder, Location, ObjectHeader, Parameters, SetupParameter,
			SubscribeDoneCode, SubscribeErrorCode,
		},
		test::MockTransport,
	};

	const SESSION: StreamId = StreamId(0);
	const CONTROL: StreamId = StreamId(4);

	fn headers(status: &str) -> Event {
		Event::Headers {
			stream_id: SESSION,
			headers: vec![(":status".to_string(), status.to_string())],
		}
	}

	fn control<M: Message>(msg: &M) -> Event {
		Event::StreamData {
			stream_id: CONTROL,
			data: encode_message(msg, Version::Draft07).unwrap(),
			fin: false,
		}
	}

	fn server_setup(version: u64, max_subscribe_id: Option<u64>) -> ServerSetup {
		let mut parameters = Parameters::default();
		if let Some(max) = max_subscribe_id {
			parameters.set_varint(SetupParameter::MaxSubscribeId, max).unwrap();
		}

		ServerSetup {
			version: coding::Version(version),
			parameters,
		}
	}

	fn object(stream: u64, group: u32, subgroup: u32, object: u32) -> Event {
		let mut data = Vec::new();
		ObjectHeader {
			group_id: group,
			subgroup_id: subgroup,
			object_id: object,
		}
		.encode(&mut data, ())
		.unwrap();
		data.extend_from_slice(&[0u8; 100]);

		Event::StreamData {
			stream_id: StreamId(stream),
			data: data.into(),
			fin: true,
		}
	}

	async fn until(session: &Session<MockTransport>, state: HandshakeState) {
		while session.state() != state {
			tokio::task::yield_now().await;
		}
	}

	fn start_initialize(session: &Session<MockTransport>) -> tokio::task::JoinHandle<Result<(), Error>> {
		let session = session.clone();
		tokio::spawn(async move { session.initialize("relay.example", 4443, Duration::from_secs(30)).await })
	}

	async fn established(max_subscribe_id: Option<u64>) -> Session<MockTransport> {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		let init = start_initialize(&session);

		until(&session, HandshakeState::WebTransportRequested).await;
		session.handle_event(headers("200")).unwrap();

		until(&session, HandshakeState::ClientSetupSent).await;
		session
			.handle_event(control(&server_setup(0xff000007, max_subscribe_id)))
			.unwrap();

		init.await.unwrap().unwrap();
		session
	}

	fn sent(session: &Session<MockTransport>) -> Vec<ControlMessage> {
		session.conn.lock().transport.control_messages(CONTROL)
	}

	#[tokio::test(start_paused = true)]
	async fn test_initialize() {
		let session = established(None).await;
		assert_eq!(session.state(), HandshakeState::MoqtEstablished);
		assert_eq!(session.version(), Some(Version::Draft07));
		assert_eq!(session.server_parameters(), Some(Parameters::default()));

		let conn = session.conn.lock();
		let request = &conn.transport.requests[0];
		let header = |name: &str| {
			request
				.iter()
				.find(|(k, _)| k == name)
				.map(|(_, v)| v.clone())
				.unwrap()
		};
		assert_eq!(header(":method"), "CONNECT");
		assert_eq!(header(":protocol"), "webtransport");
		assert_eq!(header(":scheme"), "https");
		assert_eq!(header(":authority"), "relay.example:4443");
		assert_eq!(header(":path"), "/moq");
		assert_eq!(header("sec-webtransport-http3-draft"), "draft02");

		assert_eq!(conn.transport.opened, vec![CONTROL]);
		assert_eq!(
			conn.transport.control_messages(CONTROL),
			vec![ControlMessage::ClientSetup(ClientSetup::new(Version::Draft07))]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_status_rejected() {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		let init = start_initialize(&session);

		until(&session, HandshakeState::WebTransportRequested).await;
		assert!(session.handle_event(headers("404")).is_err());

		let err = init.await.unwrap().unwrap_err();
		assert!(matches!(err, Error::Setup(SetupError::Status(status)) if status == "404"));
		assert!(session.state().is_failed());
		assert!(session.conn.lock().transport.opened.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_connect_timeout() {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		let err = session
			.initialize("localhost", 4433, Duration::from_secs(30))
			.await
			.unwrap_err();

		assert!(matches!(err, Error::Timeout(Stage::WebTransport)));
		assert!(session.state().is_failed());
	}

	#[tokio::test(start_paused = true)]
	async fn test_setup_timeout() {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		let init = start_initialize(&session);

		until(&session, HandshakeState::WebTransportRequested).await;
		session.handle_event(headers("200")).unwrap();

		let start = tokio::time::Instant::now();
		let err = init.await.unwrap().unwrap_err();
		assert!(matches!(err, Error::Timeout(Stage::Setup)));
		assert_eq!(start.elapsed(), Duration::from_secs(5));
		assert!(session.state().is_failed());

		// A late SERVER_SETUP doesn't revive the session.
		session.handle_event(control(&server_setup(0xff000007, None))).unwrap();
		assert!(session.state().is_failed());

		assert!(matches!(
			session.subscribe("live", "camera1"),
			Err(Error::Timeout(Stage::Setup))
		));
		assert_eq!(
			sent(&session),
			vec![ControlMessage::ClientSetup(ClientSetup::new(Version::Draft07))]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_version_rejected() {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		let init = start_initialize(&session);

		until(&session, HandshakeState::WebTransportRequested).await;
		session.handle_event(headers("200")).unwrap();
		until(&session, HandshakeState::ClientSetupSent).await;

		assert!(session
			.handle_event(control(&server_setup(0xff000008, None)))
			.is_err());

		let err = init.await.unwrap().unwrap_err();
		assert!(matches!(
			err,
			Error::Setup(SetupError::Version(coding::Version(0xff000008)))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_subscribe_before_setup() {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		assert!(matches!(
			session.subscribe("live", "camera1"),
			Err(Error::NotReady(HandshakeState::Idle))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_subscribe_lifecycle() {
		let session = established(None).await;

		let subscription = session.subscribe("live", "camera1").unwrap();
		assert_eq!(subscription.id, SubscribeId(1));
		assert_eq!(subscription.status, SubscriptionStatus::Pending);

		match sent(&session).last() {
			Some(ControlMessage::Subscribe(msg)) => {
				assert_eq!(msg.track_namespace, TrackNamespace::from("live"));
				assert_eq!(msg.track_name.as_ref(), b"camera1");
				assert_eq!(msg.subscriber_priority, 128);
				assert_eq!(msg.group_order, GroupOrder::Ascending);
				assert_eq!(msg.filter_type, FilterType::LatestGroup);
			}
			other => panic!("expected SUBSCRIBE, got {other:?}"),
		}

		// Wait for the reply while it's delivered.
		let waiter = {
			let session = session.clone();
			tokio::spawn(async move { session.subscribed(SubscribeId(1), Duration::from_secs(5)).await })
		};
		tokio::task::yield_now().await;

		session
			.handle_event(control(&ietf::SubscribeOk {
				id: SubscribeId(1),
				expires: 0,
				group_order: GroupOrder::Ascending,
				largest: Some(Location::new(1, 0)),
				parameters: Parameters::default(),
			}))
			.unwrap();

		let active = waiter.await.unwrap().unwrap();
		assert!(matches!(active.status, SubscriptionStatus::Active { .. }));

		for event in [
			object(2, 1, 0, 0),
			object(6, 1, 0, 1),
			object(10, 1, 1, 0),
			object(14, 2, 0, 0),
		] {
			session.handle_event(event).unwrap();
		}

		let groups = session.groups();
		assert_eq!(groups[&1].objects, 3);
		assert_eq!(groups[&1].subgroups, vec![0, 1]);
		assert_eq!(groups[&1].bytes, 300);
		assert_eq!(groups[&2].objects, 1);
		assert_eq!(groups[&2].subgroups, vec![0]);

		session.unsubscribe(SubscribeId(1)).unwrap();
		assert_eq!(
			sent(&session).last(),
			Some(&ControlMessage::Unsubscribe(ietf::Unsubscribe { id: SubscribeId(1) }))
		);

		session
			.handle_event(control(&ietf::SubscribeDone {
				id: SubscribeId(1),
				code: SubscribeDoneCode::Unsubscribed,
				reason: String::new(),
				final_location: Some(Location::new(2, 0)),
			}))
			.unwrap();

		let done = session
			.subscribe_done(SubscribeId(1), Duration::from_secs(5))
			.await
			.unwrap();
		assert!(done.unsubscribed);
		assert!(matches!(
			done.status,
			SubscriptionStatus::Done {
				code: SubscribeDoneCode::Unsubscribed,
				..
			}
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_subscribe_rejected() {
		let session = established(None).await;
		session.subscribe("live", "camera1").unwrap();
		session.subscribe("live", "camera2").unwrap();

		session
			.handle_event(control(&ietf::SubscribeError {
				id: SubscribeId(2),
				code: SubscribeErrorCode::TrackDoesNotExist,
				reason: "no such track".to_string(),
				track_alias: 0,
			}))
			.unwrap();

		let err = session
			.subscribed(SubscribeId(2), Duration::from_secs(5))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Subscribe { code: 3, reason } if reason == "no such track"));

		// The other subscription is still waiting, and the wait times out without failing the session.
		let err = session
			.subscribed(SubscribeId(1), Duration::from_secs(5))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Timeout(Stage::Subscribe)));
		assert!(session.state().is_established());
	}

	#[tokio::test(start_paused = true)]
	async fn test_max_subscribe_id() {
		let session = established(Some(2)).await;

		session.subscribe("live", "camera1").unwrap();
		assert!(matches!(
			session.subscribe("live", "camera2"),
			Err(Error::TooManySubscribes)
		));

		session
			.handle_event(control(&ietf::MaxSubscribeId { id: SubscribeId(3) }))
			.unwrap();
		let subscription = session.subscribe("live", "camera2").unwrap();
		assert_eq!(subscription.id, SubscribeId(2));
	}

	#[tokio::test(start_paused = true)]
	async fn test_malformed_control_dropped() {
		let session = established(None).await;
		session.subscribe("live", "camera1").unwrap();

		// SUBSCRIBE_OK with a trailing byte, then an unknown message type.
		let data = Bytes::from_static(&[0x04, 0x06, 0x01, 0x00, 0x01, 0x00, 0x00, 0xff, 0x20, 0x01, 0x00]);
		session
			.handle_event(Event::StreamData {
				stream_id: CONTROL,
				data,
				fin: false,
			})
			.unwrap();

		assert!(session.state().is_established());
		assert_eq!(
			session.subscription(SubscribeId(1)).unwrap().status,
			SubscriptionStatus::Pending
		);

		// A corrupt data stream is dropped too.
		session
			.handle_event(Event::StreamData {
				stream_id: StreamId(2),
				data: Bytes::from_static(&[0x00, 0x01]),
				fin: true,
			})
			.unwrap();
		assert!(session.groups().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_connection_error() {
		let session = established(None).await;

		let err = session
			.handle_event(Event::ConnectionError {
				code: 0x10,
				reason: "going away".to_string(),
			})
			.unwrap_err();
		assert!(matches!(err, Error::Connection { code: 0x10, .. }));
		assert!(session.state().is_failed());
		assert!(matches!(
			session.subscribe("live", "camera1"),
			Err(Error::Connection { .. })
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_transport_failed_connect() {
		let transport = MockTransport {
			fail: true,
			..Default::default()
		};
		let session = Session::new(transport, SessionConfig::default());

		let err = session
			.initialize("localhost", 4433, Duration::from_secs(30))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Transport(_)));
		assert!(session.state().is_failed());
		assert!(session.conn.lock().transport.requests.is_empty());

		// The first error sticks.
		let again = session
			.initialize("localhost", 4433, Duration::from_secs(30))
			.await
			.unwrap_err();
		assert!(matches!(again, Error::Transport(_)));
		assert!(matches!(session.error(), Error::Transport(_)));
		assert!(matches!(
			session.subscribe("live", "camera1"),
			Err(Error::Transport(_))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_transport_failed_subscribe() {
		let session = established(None).await;
		session.conn.lock().transport.fail = true;

		let err = session.subscribe("live", "camera1").unwrap_err();
		assert!(matches!(err, Error::Transport(_)));
		assert!(session.state().is_failed());
		assert!(session.subscription(SubscribeId(1)).is_none());

		assert!(matches!(
			session.subscribe("live", "camera2"),
			Err(Error::Transport(_))
		));
		assert!(matches!(session.unsubscribe(SubscribeId(1)), Err(Error::Transport(_))));
		assert!(matches!(
			session.subscribed(SubscribeId(1), Duration::from_secs(5)).await,
			Err(Error::NotFound)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_from_channel() {
		let session = Session::new(MockTransport::default(), SessionConfig::default());
		let (tx, rx) = mpsc::unbounded_channel();
		session.start(rx);

		let init = start_initialize(&session);
		until(&session, HandshakeState::WebTransportRequested).await;
		tx.send(headers("200")).unwrap();

		until(&session, HandshakeState::ClientSetupSent).await;
		tx.send(control(&server_setup(0xff000007, None))).unwrap();
		init.await.unwrap().unwrap();

		drop(tx);
		until(&session, HandshakeState::Failed(Error::Closed.to_string())).await;
	}
}
