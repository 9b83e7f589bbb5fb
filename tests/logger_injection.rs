use std::sync::{Arc, Mutex};
use std::time::Duration;

struct BridgeCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl BridgeCapture {
    fn new() -> Self { Self { messages: Arc::new(Mutex::new(Vec::new())) } }
}

impl crowdpilot::domains::logger::DomainLogger for BridgeCapture {
    fn info(&self, msg: &str) { self.messages.lock().unwrap().push(format!("INFO:{}", msg)); }
    fn warn(&self, msg: &str) { self.messages.lock().unwrap().push(format!("WARN:{}", msg)); }
    fn error(&self, msg: &str) { self.messages.lock().unwrap().push(format!("ERR:{}", msg)); }
    fn debug(&self, msg: &str) { self.messages.lock().unwrap().push(format!("DEBUG:{}", msg)); }
}

#[tokio::test]
async fn test_buffered_and_noop_logger() {
    let capture = Arc::new(BridgeCapture::new());
    let bridge = capture.clone() as Arc<dyn crowdpilot::domains::logger::DomainLogger>;

    // Buffered logger forwarding to the bridge with a small channel
    let buffered = crowdpilot::adapters::outbound::init_buffered_logger(bridge.clone(), 8);

    buffered.info("one");
    buffered.warn("two");
    buffered.error("three");
    buffered.debug("four");

    // Give the background task a moment
    tokio::time::sleep(Duration::from_millis(50)).await;

    let msgs = capture.messages.lock().unwrap();
    assert!(msgs.iter().any(|m| m.contains("INFO:one")));
    assert!(msgs.iter().any(|m| m.contains("WARN:two")));
    assert!(msgs.iter().any(|m| m.contains("ERR:three")));
    assert!(msgs.iter().any(|m| m.contains("DEBUG:four")));

    let noop = crowdpilot::adapters::outbound::init_noop_logger();
    noop.info("ignored");
    noop.error("ignored-err");
}

#[tokio::test]
async fn test_buffered_logger_drops_when_full() {
    struct Stalled;
    impl crowdpilot::domains::logger::DomainLogger for Stalled {
        fn info(&self, _msg: &str) { std::thread::sleep(Duration::from_millis(200)); }
        fn warn(&self, _msg: &str) {}
        fn error(&self, _msg: &str) {}
    }

    let logger = crowdpilot::adapters::outbound::BufferedLogger::spawn(Arc::new(Stalled), 1);
    for i in 0..20 {
        crowdpilot::domains::logger::DomainLogger::info(logger.as_ref(), &format!("msg {}", i));
    }
    assert!(logger.dropped() > 0);
}

#[tokio::test]
async fn test_agent_logger_prefixes_messages() {
    let capture = Arc::new(BridgeCapture::new());
    let scoped = crowdpilot::domains::logger::AgentLogger::scoped("ped-7", capture.clone());

    scoped.info("starting");
    scoped.warn("blocked");

    let msgs = capture.messages.lock().unwrap();
    assert_eq!(msgs[0], "INFO:[ped-7] starting");
    assert_eq!(msgs[1], "WARN:[ped-7] blocked");
}

#[test]
fn test_console_logger_without_subscriber() {
    let console = crowdpilot::adapters::outbound::init_console_logger();
    console.info("no subscriber installed");
    console.debug("still fine");
}

#[test]
fn test_file_logger_writes_to_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crowdpilot.log");
    let logger = crowdpilot::adapters::outbound::init_file_logger(path.to_str().unwrap()).unwrap();
    logger.info("written through fast_log");
    logger.warn("second line");
}
