// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use routeros_api::protocol::{read_word, write_word};
use routeros_api::{
    Client, Config, Connector, Error, ExportChannel, ReadOptions, Reply, Response, SessionState,
    TransportError, Where, blocking,
};
use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

const CHALLENGE: &str = "0123456789abcdef0123456789abcdef";
const PASSWORD: &str = "secret";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy)]
enum Firmware {
    /// 6.43+: plain-text password
    Modern,
    /// pre-6.43: challenge/response
    Legacy,
    /// answers every `/login` with a challenge
    Confused,
}

/// In-memory router speaking the API over a duplex pipe
#[derive(Clone)]
struct FakeRouter {
    firmware: Firmware,
    sentences: Arc<Mutex<Vec<Vec<String>>>>,
    connects: Arc<AtomicUsize>,
}

impl FakeRouter {
    fn new(firmware: Firmware) -> Self {
        Self {
            firmware,
            sentences: Arc::default(),
            connects: Arc::default(),
        }
    }

    fn sentences(&self) -> Vec<Vec<String>> {
        self.sentences.lock().unwrap().clone()
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn reply_to(&self, sentence: &[String]) -> Vec<Vec<String>> {
        match sentence[0].as_str() {
            "/login" => self.login(sentence),
            "/interface/print" => vec![
                block(&["!re", "=.id=*1", "=name=ether1", "=type=ether"]),
                block(&["!re", "=.id=*2", "=name=ether2", "=type=ether"]),
                block(&["!done"]),
            ],
            "/system/identity/print" => {
                vec![block(&["!re", "=name=MikroTik"]), block(&["!done"])]
            }
            "/tool/torch" => (0..5)
                .map(|i| vec!["!re".to_string(), format!("=rx={i}")])
                .collect(),
            "/quit" => vec![block(&["!fatal", "session terminated on request"])],
            _ => vec![
                block(&["!trap", "=message=no such command"]),
                block(&["!done"]),
            ],
        }
    }

    fn login(&self, sentence: &[String]) -> Vec<Vec<String>> {
        let attribute = |prefix: &str| {
            sentence
                .iter()
                .find_map(|w| w.strip_prefix(prefix).map(str::to_string))
        };
        let challenge = vec![block(&["!done", &format!("=ret={CHALLENGE}")])];
        let rejected = vec![
            block(&["!trap", "=message=invalid user name or password (6)"]),
            block(&["!done"]),
        ];

        match self.firmware {
            Firmware::Modern => match attribute("=password=") {
                Some(password) if password == PASSWORD => vec![block(&["!done"])],
                _ => rejected,
            },
            Firmware::Legacy => match attribute("=response=") {
                Some(response) if response == expected_response(PASSWORD) => {
                    vec![block(&["!done"])]
                }
                Some(_) => rejected,
                None => challenge,
            },
            Firmware::Confused => challenge,
        }
    }
}

fn block(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn expected_response(password: &str) -> String {
    let mut data = vec![0u8];
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&hex::decode(CHALLENGE).unwrap());
    format!("00{:x}", md5::compute(&data))
}

async fn read_sentence(stream: &mut DuplexStream) -> routeros_api::Result<Vec<String>> {
    let mut words = Vec::new();
    loop {
        let word = read_word(stream).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(String::from_utf8(word).unwrap());
    }
}

async fn serve(mut stream: DuplexStream, router: FakeRouter) {
    while let Ok(sentence) = read_sentence(&mut stream).await {
        router.sentences.lock().unwrap().push(sentence.clone());
        for reply_block in router.reply_to(&sentence) {
            for word in reply_block.iter().chain(std::iter::once(&String::new())) {
                if write_word(&mut stream, word.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
        if stream.flush().await.is_err() {
            return;
        }
    }
}

impl Connector for FakeRouter {
    type Stream = DuplexStream;

    async fn connect(&self, _config: &Config) -> Result<DuplexStream, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (client, server) = duplex(64 * 1024);
        tokio::spawn(serve(server, self.clone()));
        Ok(client)
    }
}

/// Connector whose every attempt is refused
#[derive(Default)]
struct RefusingConnector {
    attempts: AtomicUsize,
}

impl Connector for &RefusingConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _config: &Config) -> Result<DuplexStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::from_raw_os_error(111).into())
    }
}

fn config() -> Config {
    Config::new("router.test", "admin", PASSWORD)
        .with_attempts(3)
        .with_delay(0)
}

async fn connected(router: &FakeRouter) -> Client<FakeRouter> {
    let mut client = Client::with_connector(config(), router.clone()).unwrap();
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn test_modern_login() {
    init_tracing();
    let router = FakeRouter::new(Firmware::Modern);
    let client = connected(&router).await;

    assert_eq!(client.state(), SessionState::Ready);
    assert!(!client.config().legacy);
    assert_eq!(
        router.sentences(),
        vec![block(&["/login", "=name=admin", "=password=secret"])]
    );
}

#[tokio::test]
async fn test_legacy_firmware_is_detected() {
    let router = FakeRouter::new(Firmware::Legacy);
    let client = connected(&router).await;

    assert!(client.is_connected());
    assert!(client.config().legacy);
    let response = format!("=response={}", expected_response(PASSWORD));
    assert_eq!(
        router.sentences(),
        vec![
            block(&["/login", "=name=admin", "=password=secret"]),
            block(&["/login"]),
            block(&["/login", "=name=admin", &response]),
        ]
    );
}

#[tokio::test]
async fn test_legacy_fallback_happens_once() {
    let router = FakeRouter::new(Firmware::Confused);
    let mut client =
        Client::with_connector(config().with_attempts(1), router.clone()).unwrap();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, Error::Connect { attempts: 1, .. }));
    // modern attempt, challenge request, challenge response; nothing more
    assert_eq!(router.sentences().len(), 3);
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_bad_credentials_are_not_retried() {
    let router = FakeRouter::new(Firmware::Modern);
    let config = Config::new("router.test", "admin", "wrong").with_delay(0);
    let mut client = Client::with_connector(config, router.clone()).unwrap();

    assert!(matches!(
        client.connect().await,
        Err(Error::BadCredentials)
    ));
    assert_eq!(router.connects(), 1);
}

#[tokio::test]
async fn test_connect_gives_up_after_attempts() {
    let connector = RefusingConnector::default();
    let mut client = Client::with_connector(config(), &connector).unwrap();

    match client.connect().await.unwrap_err() {
        Error::Connect {
            address,
            attempts,
            source,
        } => {
            assert_eq!(address, "router.test:8728");
            assert_eq!(attempts, 3);
            assert_eq!(source.code, Some(111));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_connect_sleeps_between_attempts_only() {
    let connector = RefusingConnector::default();
    let config = config().with_attempts(3).with_delay(5);
    let mut client = Client::with_connector(config, &connector).unwrap();

    let started = tokio::time::Instant::now();
    assert!(client.connect().await.is_err());
    let elapsed = started.elapsed();

    // two pauses between three attempts, none after the last
    assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(15), "elapsed {elapsed:?}");
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_query_and_read_rows() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    let reply = client
        .query_read("/interface/print", None, None, None, ReadOptions::default())
        .await
        .unwrap();
    let rows = reply.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "ether1");
    assert_eq!(rows[1][".id"], "*2");
}

#[tokio::test]
async fn test_filter_and_tag_words_are_sent() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    client
        .query(
            "/interface/print",
            Some(Where::from([["type", "ether"], ["running", "true"]])),
            Some("|"),
            Some("t1"),
        )
        .await
        .unwrap()
        .read(ReadOptions::default())
        .await
        .unwrap();

    assert_eq!(
        router.sentences().last().unwrap(),
        &block(&[
            "/interface/print",
            "?type=ether",
            "?running=true",
            "?#|",
            ".tag=t1",
        ])
    );
}

#[tokio::test]
async fn test_shortcuts_pass_filter_tag_and_options() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    let reply = client
        .query_read(
            "/interface/print",
            Some(Where::from(["type", "ether"])),
            None,
            Some("9"),
            ReadOptions::raw(),
        )
        .await
        .unwrap();
    assert!(matches!(reply, Reply::Raw(_)));
    assert_eq!(
        router.sentences().last().unwrap(),
        &block(&["/interface/print", "?type=ether", ".tag=9"])
    );

    let cursor = client
        .query_iter("/tool/torch", None, Some("|"), None, Some(3))
        .await
        .unwrap();
    assert_eq!(cursor.count(), 3);
    assert_eq!(
        router.sentences().last().unwrap(),
        &block(&["/tool/torch", "?#|"])
    );
}

#[tokio::test]
async fn test_trap_reply_is_data() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    let response = client
        .query_read("/no/such/thing", None, None, None, ReadOptions::default())
        .await
        .unwrap()
        .into_response()
        .unwrap();
    assert!(response.rows.is_empty());
    assert_eq!(response.after_value("message"), Some("no such command"));
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_raw_read_with_count() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    let reply = client
        .query("/tool/torch", None, None, None)
        .await
        .unwrap()
        .read(ReadOptions::raw().count(2))
        .await
        .unwrap();
    assert_eq!(
        reply,
        Reply::Raw(block(&["!re", "=rx=0", "!re", "=rx=1"]))
    );
}

#[tokio::test]
async fn test_read_as_iterator() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    let mut cursor = client
        .query_iter("/interface/print", None, None, None, None)
        .await
        .unwrap();
    assert_eq!(cursor.count(), 2);
    assert_eq!(cursor.current().unwrap()["name"], "ether1");
    cursor.next();
    assert_eq!(cursor.current().unwrap()["name"], "ether2");
    assert_eq!(cursor.parse_count(), 2);
}

#[tokio::test]
async fn test_fatal_ends_session() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    let reply = client
        .query_read("/quit", None, None, None, ReadOptions::default())
        .await
        .unwrap();
    assert!(reply.is_fatal());
    assert_eq!(client.state(), SessionState::Disconnected);

    let err = client
        .query_read("/interface/print", None, None, None, ReadOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Stream(e) => assert_eq!(e.kind(), io::ErrorKind::NotConnected),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_reconnect_after_close() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await;

    client.close().await.unwrap();
    assert!(!client.is_connected());
    client.connect().await.unwrap();
    assert_eq!(router.connects(), 2);
    let reply = client
        .query_read("/interface/print", None, None, None, ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(reply.rows().len(), 2);
}

struct CannedExport {
    calls: Arc<Mutex<Vec<String>>>,
}

impl ExportChannel for CannedExport {
    fn run_export<'a>(
        &'a mut self,
        _config: &'a Config,
        arguments: &'a str,
    ) -> BoxFuture<'a, routeros_api::Result<String>> {
        self.calls.lock().unwrap().push(arguments.to_string());
        Box::pin(async {
            Ok("/interface ethernet\nset [ find default-name=ether1 ] comment=wan\n".to_string())
        })
    }
}

#[tokio::test]
async fn test_export_goes_through_side_channel() {
    let router = FakeRouter::new(Firmware::Modern);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut client = connected(&router).await.with_export_channel(CannedExport {
        calls: calls.clone(),
    });

    let reply = client
        .query_read("/export/terse", None, None, None, ReadOptions::default())
        .await
        .unwrap();
    let Reply::Export(text) = reply else {
        panic!("expected export output");
    };
    assert!(text.starts_with("/interface ethernet"));
    assert_eq!(*calls.lock().unwrap(), vec!["terse".to_string()]);

    // the API socket never saw /export and is still usable
    assert!(router.sentences().iter().all(|s| s[0] != "/export/terse"));
    let reply = client
        .query_read("/system/identity/print", None, None, None, ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(reply.rows()[0]["name"], "MikroTik");
}

#[tokio::test]
async fn test_export_output_is_returned_once() {
    let router = FakeRouter::new(Firmware::Modern);
    let config = config().with_socket_timeout(1);
    let mut client = Client::with_connector(config, router.clone())
        .unwrap()
        .with_export_channel(CannedExport {
            calls: Arc::default(),
        });
    client.connect().await.unwrap();

    client.query("/export", None, None, None).await.unwrap();
    assert!(matches!(
        client.read(ReadOptions::default()).await,
        Ok(Reply::Export(_))
    ));

    // nothing was sent to the router, so there is nothing to wait for
    let started = tokio::time::Instant::now();
    let reply = client.read(ReadOptions::default()).await.unwrap();
    assert_eq!(reply, Reply::Data(Response::default()));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(client.is_connected());
    assert_eq!(router.sentences().len(), 1);
}

#[tokio::test]
async fn test_iterator_refuses_pending_export() {
    let router = FakeRouter::new(Firmware::Modern);
    let mut client = connected(&router).await.with_export_channel(CannedExport {
        calls: Arc::default(),
    });

    client.query("/export", None, None, None).await.unwrap();
    assert!(matches!(
        client.read_as_iterator(None).await,
        Err(Error::Query(_))
    ));
    assert!(matches!(
        client.read(ReadOptions::default()).await,
        Ok(Reply::Export(_))
    ));
}

#[test]
fn test_blocking_client() {
    let router = FakeRouter::new(Firmware::Legacy);
    let mut client = blocking::Client::with_connector(config(), router.clone()).unwrap();

    client.connect().unwrap();
    assert!(client.config().legacy);

    let reply = client
        .query_read("/interface/print", None, None, None, ReadOptions::default())
        .unwrap();
    assert_eq!(reply.rows().len(), 2);
    client.close().unwrap();
    assert_eq!(client.state(), SessionState::Disconnected);
}
