//! Track following example
//!
//! Generates a TPC event, follows its seeds with the requested switches and
//! prints the counters and a per-track summary.

use clap::Parser;
use tpc_track_follower::bench_utils::{load_scenario, prepare, ScenarioJson};
use tpc_track_follower::{
    FollowerConfig, HitSharing, SolenoidField, Tracker, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Random seed for deterministic runs
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of generated tracks
    #[arg(short = 'n', long, default_value_t = 50)]
    num_tracks: usize,

    /// Scenario JSON file, overrides the generator options
    #[arg(long)]
    scenario: Option<String>,

    /// Smear hits with the default TPC resolution
    #[arg(long)]
    smear: bool,

    /// Seed with a least-squares fit instead of the three-point helix
    #[arg(long)]
    least_squares: bool,

    /// Refit every track over all of its hits
    #[arg(short = 'p', long)]
    precise: bool,

    /// Hit sharing policy: Shared or Exclusive
    #[arg(long, default_value = "Shared")]
    hit_sharing: String,

    /// Worker threads, 0 for the rayon default
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,

    /// Track with a solenoid field map instead of the default field
    #[arg(long)]
    field_map: bool,

    /// Print every track
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let hit_sharing = match args.hit_sharing.as_str() {
        "Shared" => HitSharing::Shared,
        "Exclusive" => HitSharing::Exclusive,
        _ => {
            eprintln!("Unknown hit sharing policy: {}", args.hit_sharing);
            eprintln!("Valid options: Shared, Exclusive");
            std::process::exit(1);
        }
    };

    let scenario = match &args.scenario {
        Some(path) => load_scenario(path).unwrap_or_else(|err| {
            eprintln!("{}", err);
            std::process::exit(1);
        }),
        None => ScenarioJson {
            num_tracks: args.num_tracks,
            seed: args.seed,
            bz: 1.4,
            pt_range: None,
            tan_lambda_range: None,
            smearing: args.smear.then_some([0.02, 0.08]),
            detector: None,
        },
    };

    println!("TPC Track Following Example");
    println!("===========================");
    println!("Seed: {}", scenario.seed);
    println!("Tracks: {}", scenario.num_tracks);
    println!("Seeding: {}", if args.least_squares { "least squares" } else { "helix" });
    println!("Precise refit: {}", args.precise);
    println!("Hit sharing: {:?}", hit_sharing);
    println!();

    println!("Generating event...");
    let prep = prepare(&scenario).unwrap_or_else(|err| {
        eprintln!("Cannot prepare scenario: {}", err);
        std::process::exit(1);
    });
    println!("Hits: {}", prep.event.hits.len());
    println!("Seeds: {}", prep.event.seeds.len());
    println!();

    let follower = FollowerConfig::default()
        .with_hit_sharing(hit_sharing)
        .with_num_threads(args.threads);
    let config = TrackerConfig::default().with_follower(follower);
    let mut tracker = Tracker::new(config)
        .unwrap_or_else(|err| {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        })
        .with_geometry(prep.geometry.clone());
    if args.field_map {
        let map = SolenoidField::new(scenario.bz, 140.0, 200.0).unwrap_or_else(|err| {
            eprintln!("Invalid field map: {}", err);
            std::process::exit(1);
        });
        tracker = tracker.with_field_map(Box::new(map));
    }
    tracker.set_track_follower_optimization_helix(!args.least_squares);
    tracker.set_track_follower_optimization_precise_fit(args.precise);

    println!("Following tracks...");
    let result = match tracker.process_event(&prep.event.hits, &prep.event.seeds) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Tracking failed: {}", err);
            std::process::exit(1);
        }
    };

    println!(
        "Completed in {:.3}s ({:.1} tracks/s)",
        result.elapsed.as_secs_f64(),
        result.tracks_per_second
    );
    println!();
    println!("Results:");
    println!("  Tracks: {}", result.tracks.len());
    println!("  Counters: {}", result.stats.to_json());

    if !result.tracks.is_empty() {
        let mean_hits = result.tracks.iter().map(|t| t.num_measurements()).sum::<usize>() as f64
            / result.tracks.len() as f64;
        let total_chi2: f64 = result.tracks.iter().map(|t| t.reduced_chi2()).sum();
        let mean_chi2 = total_chi2 / result.tracks.len() as f64;
        println!("  Mean hits per track: {:.1}", mean_hits);
        println!("  Mean chi2/ndf: {:.3}", mean_chi2);
    }

    if args.verbose {
        println!();
        for track in &result.tracks {
            let truth = &prep.event.truth[prep.event.seed_truth[track.seed_index]];
            println!(
                "  seed {:>4}  {:?}  hits {:>2}  q {:>2}  pT {:>7.3} (true {:>7.3})  \
                 chi2/ndf {:.3}",
                track.seed_index,
                track.status,
                track.num_measurements(),
                track.charge(),
                track.pt().unwrap_or(f64::INFINITY),
                truth.pt,
                track.reduced_chi2()
            );
        }
    }

    if let Some(snapshot) = tracker.snapshot() {
        println!();
        println!("Configuration:");
        println!("{}", snapshot.to_json_pretty());
    }
}
