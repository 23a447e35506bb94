//! Fly a scripted keyboard sequence and print each frame as a JSON line.
//!
//! One object per line:
//!
//! {"frame":12,"x":0.000,"y":2.400,"z":0.000,"roll":0.0,"pitch":0.0,"yaw":0.0,"grounded":false,"camera":"follow","source":"keyboard"}
//!
//! Usage: cargo run --example fly [frames]

use dronesim::{FrameOutput, Renderer, SimConfig, SimulationContext};
use std::io::{self, BufWriter, Stdout, Write};

/// Key held over a frame range, [start, end).
const SCRIPT: &[(&str, u64, u64)] = &[
    ("w", 0, 60),
    ("ArrowDown", 60, 120),
    ("d", 90, 150),
    ("c", 150, 151),
    ("ArrowLeft", 150, 210),
    ("c", 210, 211),
    ("m", 240, 241),
    ("s", 240, 400),
];

struct JsonLines {
    out: BufWriter<Stdout>,
}

impl Renderer for JsonLines {
    fn render(&mut self, frame: &FrameOutput) {
        let Some(drone) = frame.drone else {
            return;
        };
        let p = drone.position;
        let [roll, pitch, yaw] = drone.euler_deg();
        let _ = writeln!(
            self.out,
            "{{\"frame\":{},\"x\":{:.3},\"y\":{:.3},\"z\":{:.3},\"roll\":{:.1},\"pitch\":{:.1},\"yaw\":{:.1},\"grounded\":{},\"camera\":\"{}\",\"source\":\"{}\"}}",
            frame.frame,
            p.x,
            p.y,
            p.z,
            roll,
            pitch,
            yaw,
            frame.grounded,
            frame.mode.as_str(),
            frame.source.as_str(),
        );
        let _ = self.out.flush();
    }
}

fn main() {
    env_logger::init();

    let frames: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(400);

    let mut sim = match SimulationContext::new(SimConfig::from_env()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to create simulation: {}", e);
            std::process::exit(1);
        }
    };
    sim.drone_loaded();

    eprintln!("Flying {} frames...", frames);

    let mut renderer = JsonLines {
        out: BufWriter::new(io::stdout()),
    };

    for frame in 0..frames {
        for (key, start, end) in SCRIPT {
            if frame == *start {
                sim.key_down(key);
            }
            if frame == *end {
                sim.key_up(key);
            }
        }
        sim.tick_and_render(&mut renderer);
    }

    let last = sim.last_frame();
    if let Some(drone) = last.drone {
        eprintln!(
            "Finished at {:?} (altitude {:.2}, camera {})",
            drone.position,
            drone.altitude(),
            last.mode.as_str()
        );
    }
    sim.shutdown();
}
