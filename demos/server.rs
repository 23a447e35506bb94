//! Drone simulation server: runs the simulation at ~60 Hz and streams frames
//! to browser renderers over WebSocket.
//!
//! Each client receives one JSON object per frame:
//!
//!   {"frame":1,"x":0.0,"y":0.2,"z":0.0,"qx":0.0,"qy":0.0,"qz":0.0,"qw":1.0,
//!    "cx":0.0,"cy":5.0,"cz":-10.0,"cqx":..,"cqy":..,"cqz":..,"cqw":..,
//!    "camera":"follow","source":"keyboard","grounded":false}
//!
//! and may send input back as text messages:
//!
//!   keydown:<key>   keyup:<key>   gesture:<label>
//!   pad:connect:<id>   pad:disconnect   pad:<b0,b1,..>;<a0,a1,..>
//!   loaded   failed:<path>
//!
//! Usage:
//!   cargo run --release --example server
//!   Connect to ws://localhost:8080

use crossbeam_channel::{Receiver, Sender};
use dronesim::{FrameOutput, Gesture, GamepadSnapshot, SimConfig, SimulationContext};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tungstenite::Message;

const PORT: u16 = 8080;
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

type WsClient = Arc<Mutex<tungstenite::WebSocket<TcpStream>>>;
type Clients = Arc<Mutex<Vec<WsClient>>>;

/// Input forwarded from a client to the simulation thread.
#[derive(Debug)]
enum HostEvent {
    KeyDown(String),
    KeyUp(String),
    Gesture(Gesture),
    PadConnect(String),
    PadDisconnect,
    PadPoll(GamepadSnapshot),
    Loaded,
    Failed(String),
}

fn parse_event(text: &str) -> Option<HostEvent> {
    let (kind, rest) = text.split_once(':').unwrap_or((text, ""));
    let event = match kind {
        "keydown" => HostEvent::KeyDown(rest.to_string()),
        "keyup" => HostEvent::KeyUp(rest.to_string()),
        "gesture" => HostEvent::Gesture(Gesture::from_label(rest)?),
        "loaded" => HostEvent::Loaded,
        "failed" => HostEvent::Failed(rest.to_string()),
        "pad" => match rest.split_once(':') {
            Some(("connect", id)) => HostEvent::PadConnect(id.to_string()),
            _ if rest == "disconnect" => HostEvent::PadDisconnect,
            _ => {
                let (buttons, axes) = rest.split_once(';')?;
                let buttons = buttons
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.trim() == "1" || s.trim() == "true")
                    .collect();
                let axes = axes
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.trim().parse().unwrap_or(0.0))
                    .collect();
                HostEvent::PadPoll(GamepadSnapshot::new(buttons, axes))
            }
        },
        _ => return None,
    };
    Some(event)
}

fn main() {
    env_logger::init();

    let clients: Clients = Arc::new(Mutex::new(Vec::new()));
    let (event_tx, event_rx) = crossbeam_channel::unbounded();

    let sim_clients = clients.clone();
    let running = Arc::new(AtomicBool::new(true));
    let sim_running = running.clone();

    let sim_thread = std::thread::Builder::new()
        .name("dronesim-loop".into())
        .spawn(move || {
            sim_loop(sim_clients, event_rx, sim_running);
        })
        .expect("Failed to spawn simulation thread");

    let listener = TcpListener::bind(format!("0.0.0.0:{}", PORT)).unwrap_or_else(|e| {
        eprintln!("Failed to bind port {}: {}", PORT, e);
        std::process::exit(1);
    });

    eprintln!("[WS] Listening on ws://localhost:{}", PORT);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[TCP] accept error: {}", e);
                continue;
            }
        };

        let clients = clients.clone();
        let events = event_tx.clone();
        std::thread::spawn(move || {
            handle_websocket(stream, clients, events);
        });
    }

    running.store(false, Ordering::Relaxed);
    let _ = sim_thread.join();
}

/// Accept a client, add it to the broadcast list and forward its input.
///
/// The read timeout keeps the lock short so the simulation thread can
/// broadcast between reads.
fn handle_websocket(stream: TcpStream, clients: Clients, events: Sender<HostEvent>) {
    stream.set_nodelay(true).ok();
    stream.set_write_timeout(Some(Duration::from_secs(2))).ok();

    let ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("[WS] handshake error: {}", e);
            return;
        }
    };
    ws.get_ref()
        .set_read_timeout(Some(Duration::from_millis(5)))
        .ok();

    let ws = Arc::new(Mutex::new(ws));
    {
        let mut list = clients.lock().unwrap();
        list.push(ws.clone());
        eprintln!("[WS] Client connected ({} total)", list.len());
    }

    loop {
        let still_active = clients.lock().unwrap().iter().any(|c| Arc::ptr_eq(c, &ws));
        if !still_active {
            break;
        }

        let read = ws.lock().unwrap().read();
        match read {
            Ok(Message::Text(text)) => match parse_event(&text) {
                Some(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                None => eprintln!("[WS] ignoring message: {}", text),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(_) => break,
        }
    }

    let mut list = clients.lock().unwrap();
    list.retain(|c| !Arc::ptr_eq(c, &ws));
    eprintln!("[WS] Client disconnected ({} total)", list.len());
}

fn frame_json(frame: &FrameOutput) -> String {
    let drone = frame.drone.unwrap_or_default();
    let p = drone.position;
    let q = drone.orientation;
    let c = frame.camera.position;
    let cq = frame.camera.orientation;
    format!(
        "{{\"frame\":{},\"x\":{:.4},\"y\":{:.4},\"z\":{:.4},\"qx\":{:.5},\"qy\":{:.5},\"qz\":{:.5},\"qw\":{:.5},\"cx\":{:.4},\"cy\":{:.4},\"cz\":{:.4},\"cqx\":{:.5},\"cqy\":{:.5},\"cqz\":{:.5},\"cqw\":{:.5},\"camera\":\"{}\",\"source\":\"{}\",\"grounded\":{},\"loaded\":{}}}",
        frame.frame,
        p.x, p.y, p.z,
        q.x, q.y, q.z, q.w,
        c.x, c.y, c.z,
        cq.x, cq.y, cq.z, cq.w,
        frame.mode.as_str(),
        frame.source.as_str(),
        frame.grounded,
        frame.drone.is_some(),
    )
}

/// Simulation loop: applies client input, ticks at ~60 Hz and broadcasts.
fn sim_loop(clients: Clients, events: Receiver<HostEvent>, running: Arc<AtomicBool>) {
    let mut sim = match SimulationContext::new(SimConfig::from_env()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[SIM] Failed to create simulation: {}", e);
            return;
        }
    };

    let mut ticks: u64 = 0;
    let mut last_report = Instant::now();
    let mut next_tick = Instant::now();

    while running.load(Ordering::Relaxed) {
        for event in events.try_iter() {
            match event {
                HostEvent::KeyDown(key) => sim.key_down(&key),
                HostEvent::KeyUp(key) => sim.key_up(&key),
                HostEvent::Gesture(gesture) => {
                    sim.set_gesture_loading(false);
                    sim.feed_gesture(gesture);
                }
                HostEvent::PadConnect(id) => sim.gamepad_connected(&id),
                HostEvent::PadDisconnect => sim.gamepad_disconnected(),
                HostEvent::PadPoll(snapshot) => sim.gamepad_poll(snapshot),
                HostEvent::Loaded => sim.drone_loaded(),
                HostEvent::Failed(path) => {
                    sim.asset_failed(&path, "reported by client");
                }
            }
        }

        let frame = sim.tick();
        ticks += 1;

        let msg = Message::Text(frame_json(&frame));
        let mut list = clients.lock().unwrap();
        list.retain(|ws_arc| {
            let mut ws = ws_arc.lock().unwrap();
            ws.send(msg.clone()).is_ok()
        });
        let clients_count = list.len();
        drop(list);

        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(5) {
            let elapsed = now.duration_since(last_report).as_secs_f64();
            eprintln!(
                "[SIM] {} ticks/s, {} client(s), camera {}",
                (ticks as f64 / elapsed) as u32,
                clients_count,
                frame.mode.as_str()
            );
            ticks = 0;
            last_report = now;
        }

        next_tick += FRAME_INTERVAL;
        let now = Instant::now();
        if next_tick > now {
            std::thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    sim.shutdown();
}
