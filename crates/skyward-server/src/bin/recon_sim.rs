//! Offline reconnaissance run through a ring of obstacles.
//!
//! Flies the flight state machine in reconnaissance mode against a simulated
//! obstacle field and prints a trace of position, heading and the navigator's
//! decision. Useful for tuning the avoidance gains without a simulator.

use anyhow::Result;
use clap::Parser;
use nalgebra::Vector3;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyward_core::flight::{FlightStateMachine, Mode};
use skyward_core::models::Command;
use skyward_core::navigator::NavDecision;
use skyward_core::scan::{ObstacleField, RangeScanner, SphereObstacle};

#[derive(Parser, Debug)]
#[command(about = "Simulate obstacle-avoiding reconnaissance")]
struct Args {
    /// Simulated seconds
    #[arg(long, default_value_t = 60.0)]
    duration: f64,
    /// Control rate in Hz
    #[arg(long, default_value_t = 20.0)]
    hz: f64,
    /// Reconnaissance speed (m/s)
    #[arg(long, default_value_t = 2.0)]
    speed: f64,
    /// Radius of the obstacle ring (m)
    #[arg(long, default_value_t = 8.0)]
    ring_radius: f64,
    /// Number of obstacles in the ring
    #[arg(long, default_value_t = 12)]
    obstacles: usize,
    /// Print every Nth tick
    #[arg(long, default_value_t = 20)]
    every: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("skyward_core=info".parse()?))
        .init();

    let args = Args::parse();
    if args.hz <= 0.0 {
        anyhow::bail!("--hz must be positive");
    }

    let mut fsm = FlightStateMachine::default();
    let home = fsm.config().home;
    let field = obstacle_ring(home, args.ring_radius, args.obstacles);
    let scanner = RangeScanner::default();

    fsm.apply_command(&Command::reconnaissance(args.speed));

    let dt = 1.0 / args.hz;
    let ticks = (args.duration * args.hz).ceil() as usize;
    let mut closest = f64::INFINITY;
    let mut flee_ticks = 0usize;

    println!("{:>7} {:>8} {:>8} {:>8} {:>8}  decision", "t", "x", "z", "heading", "nearest");
    for tick in 0..ticks {
        let scan = scanner.scan(&field, &fsm.state().pose.position);
        let nearest = scan.nearest().map(|s| s.distance).unwrap_or(f64::INFINITY);
        closest = closest.min(nearest);

        let report = fsm.tick(dt, &scan);
        if matches!(report.navigation, Some(NavDecision::Flee { .. })) {
            flee_ticks += 1;
        }

        if tick % args.every.max(1) == 0 {
            let pose = fsm.state().pose;
            let decision = match report.navigation {
                Some(NavDecision::Flee { bearing_deg, distance, .. }) => {
                    format!("flee from {:.0} deg ({:.2} m)", bearing_deg, distance)
                }
                Some(NavDecision::Explore { bearing_deg, score, .. }) => {
                    format!("explore towards {:.0} deg (score {:.2})", bearing_deg, score)
                }
                None => "-".to_string(),
            };
            println!(
                "{:>7.2} {:>8.2} {:>8.2} {:>8.1} {:>8.2}  {}",
                tick as f64 * dt,
                pose.position.x,
                pose.position.z,
                pose.heading_deg(),
                nearest,
                decision
            );
        }
    }

    if fsm.state().mode != Mode::Reconnaissance {
        anyhow::bail!("left reconnaissance mode unexpectedly");
    }
    println!(
        "closest approach {:.2} m, avoiding for {:.1}% of ticks",
        closest,
        100.0 * flee_ticks as f64 / ticks.max(1) as f64
    );
    Ok(())
}

fn obstacle_ring(center: Vector3<f64>, radius: f64, count: usize) -> ObstacleField {
    let mut field = ObstacleField::default();
    for i in 0..count {
        let angle = std::f64::consts::TAU * i as f64 / count as f64;
        let offset = Vector3::new(angle.sin() * radius, 0.0, angle.cos() * radius);
        field.push(SphereObstacle::new(center + offset, 1.0));
    }
    field
}
