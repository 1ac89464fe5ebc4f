use clap::{Parser, Subcommand};
use hl_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, ServiceState,
    SimulationService, plant_service, query, run_service,
};
use hl_core::report::{bar, kw, rpm};
use hl_core::{pa, rad_per_s, watts};
use hl_project::PlantFile;
use hl_sim::{FloaterState, GeneratorSetpoint, ParameterUpdate, TickSnapshot};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hl-cli")]
#[command(about = "HydroLift CLI - buoyancy floater machine simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plant file and print its warnings
    Validate {
        /// Path to the plant file (.yaml, .yml or .json)
        plant_path: PathBuf,
    },
    /// Write a plant file with default parameters
    Defaults {
        /// Output path; YAML to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Plant name
        #[arg(long, default_value = "hydrolift")]
        name: String,
    },
    /// Run a plant headless to its end time
    Run {
        /// Path to the plant file
        plant_path: PathBuf,
        /// End time in seconds (overrides the plant file)
        #[arg(long)]
        t_end: Option<f64>,
        /// Keep every n-th snapshot (overrides the plant file)
        #[arg(long)]
        record_every: Option<u32>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Also write the recorded snapshots as JSON lines
        #[arg(long)]
        export: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cached runs for a plant
    Runs {
        /// Path to the plant file
        plant_path: PathBuf,
    },
    /// Show the summary of a cached run
    ShowRun {
        /// Path to the plant file
        plant_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export one variable of a cached run as CSV
    ExportSeries {
        /// Path to the plant file
        plant_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Variable name (e.g. omega, generator_power, tank_pressure)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a plant on the live threaded runtime, printing the latest state
    Live {
        /// Path to the plant file
        plant_path: PathBuf,
        /// Wall-clock duration in seconds
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        /// Print interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        /// Simulated seconds per wall second (overrides the plant file)
        #[arg(long)]
        rtf: Option<f64>,
        /// Switch the generator to power control at this target (W)
        #[arg(long)]
        power: Option<f64>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { plant_path } => cmd_validate(&plant_path),
        Commands::Defaults { output, name } => cmd_defaults(output.as_deref(), &name),
        Commands::Run {
            plant_path,
            t_end,
            record_every,
            no_cache,
            export,
            json,
        } => cmd_run(
            &plant_path,
            RunOptions {
                use_cache: !no_cache,
                t_end_s: t_end,
                record_every,
            },
            export.as_deref(),
            json,
        ),
        Commands::Runs { plant_path } => cmd_runs(&plant_path),
        Commands::ShowRun { plant_path, run_id } => cmd_show_run(&plant_path, &run_id),
        Commands::ExportSeries {
            plant_path,
            run_id,
            variable,
            output,
        } => cmd_export_series(&plant_path, &run_id, &variable, output.as_deref()),
        Commands::Live {
            plant_path,
            seconds,
            interval_ms,
            rtf,
            power,
        } => cmd_live(&plant_path, seconds, interval_ms, rtf, power),
    }
}

fn cmd_validate(plant_path: &Path) -> AppResult<()> {
    println!("Validating plant: {}", plant_path.display());
    let plant = plant_service::load_plant(plant_path)?;
    let report = plant_service::inspect_plant(&plant)?;
    println!("✓ Plant '{}' is valid (version {})", report.name, report.version);
    println!("  Floaters:    {}", report.floaters);
    println!("  Loop length: {:.2} m", report.loop_length_m);
    println!("  Fingerprint: {}", report.config_fingerprint);
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn cmd_defaults(output: Option<&Path>, name: &str) -> AppResult<()> {
    let plant = PlantFile::new(name);
    match output {
        Some(path) => {
            plant_service::save_plant(path, &plant)?;
            println!("✓ Wrote {}", path.display());
        }
        None => {
            let yaml = serde_yaml::to_string(&plant)
                .map_err(|e| AppError::Project(format!("Failed to serialize plant: {e}")))?;
            print!("{yaml}");
        }
    }
    Ok(())
}

fn cmd_run(
    plant_path: &Path,
    options: RunOptions,
    export: Option<&Path>,
    json: bool,
) -> AppResult<()> {
    let request = RunRequest {
        plant_path,
        options,
    };
    info!(plant = %plant_path.display(), "run requested");

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event: RunProgressEvent| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now && !json {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;

    if let Some(path) = export {
        let (_manifest, records) = run_service::load_run(plant_path, &response.run_id)?;
        let mut out = BufWriter::new(std::fs::File::create(path)?);
        hl_project::store::write_jsonl(&mut out, &records)?;
        out.flush()?;
        if !json {
            clear_progress_line();
            println!("✓ Exported {} snapshots to {}", records.len(), path.display());
        }
    }

    if json {
        let text = serde_json::to_string_pretty(&response.summary)
            .map_err(|e| AppError::InvalidInput(format!("Failed to serialize summary: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    clear_progress_line();
    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }
    print_summary(&response.summary);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.batch) {
        (RunStage::Running, Some(p)) => {
            let width = 28usize;
            let filled = ((p.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.2}/{:.2}s  tick={}  faulty={}  closure={:.1e}  elapsed={:.1}s",
                bar,
                p.fraction_complete * 100.0,
                p.sim_time_s,
                p.t_end_s,
                p.tick,
                p.faulty_ticks,
                p.closure_error,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {msg}"));
            }
            print!("{line}");
        }
    }
    let _ = io::stdout().flush();
}

fn print_summary(summary: &hl_app::RunSummary) {
    println!("\nRun summary:");
    println!("  Session:     {}", summary.identity.session_id);
    println!("  Started:     {}", summary.identity.started_at.to_rfc3339());
    println!(
        "  Time range:  {:.2} - {:.2} s ({} ticks, {} records)",
        summary.time_range.0, summary.time_range.1, summary.ticks, summary.record_count
    );
    if summary.halted {
        println!("  Status:      HALTED (fault budget exhausted)");
    }
    println!("  Fills:       {}", summary.fills_completed);
    println!("  Faults seen: {}", summary.fault_count);
    println!("  Mean power:  {:.3} kW", summary.mean_power_kw);
    println!("  Peak speed:  {:.1} rpm", summary.peak_speed_rpm);
    println!("  Final tank:  {:.2} bar", summary.final_tank_bar);

    let e = &summary.energy;
    println!("\nEnergy (kWh):");
    println!("  Hydrostatic work:  {:.5}", e.hydrostatic_kwh);
    println!("  Generator output:  {:.5}", e.generator_output_kwh);
    println!("  Generator loss:    {:.5}", e.generator_loss_kwh);
    println!("  Drag loss:         {:.5}", e.drag_loss_kwh);
    println!("  Friction loss:     {:.5}", e.friction_loss_kwh);
    println!("  Compressor input:  {:.5}", e.compressor_input_kwh);
    println!("  Injection work:    {:.5}", e.injection_work_kwh);
    println!("  Vent loss:         {:.5}", e.vent_loss_kwh);
    println!("  Closure error:     {:.2e}", e.closure_error);
}

fn cmd_runs(plant_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(plant_path)?;
    if runs.is_empty() {
        println!("No cached runs found for: {}", plant_path.display());
    } else {
        println!("Cached runs for '{}':", plant_path.display());
        for manifest in runs {
            let status = if manifest.halted { "  halted" } else { "" };
            println!(
                "  {} ({}, t_end={} s, {} ticks){}",
                manifest.run_id, manifest.timestamp, manifest.t_end_s, manifest.ticks, status
            );
        }
    }
    Ok(())
}

fn cmd_show_run(plant_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {run_id}");
    let (manifest, records) = run_service::load_run(plant_path, run_id)?;
    let mut identity = hl_app::RunIdentity::new(
        manifest.run_id.clone(),
        manifest.config_fingerprint.clone(),
    );
    if let Ok(id) = manifest.session_id.parse() {
        identity.session_id = id;
    }
    let summary = hl_app::summarize(identity, &records, manifest.fills_completed)?;
    println!("  Plant:   {}", manifest.plant_name);
    println!("  Engine:  {}", manifest.engine_version);
    println!("  Started: {}", manifest.timestamp);
    print_summary(&summary);
    Ok(())
}

fn cmd_export_series(
    plant_path: &Path,
    run_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = run_service::load_run(plant_path, run_id)?;
    let series = query::extract_series(&records, variable)?;
    let csv = query::series_csv(&series);

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{csv}");
    }
    Ok(())
}

fn cmd_live(
    plant_path: &Path,
    seconds: f64,
    interval_ms: u64,
    rtf: Option<f64>,
    power: Option<f64>,
) -> AppResult<()> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(AppError::InvalidInput(format!(
            "--seconds must be positive, got {seconds}"
        )));
    }
    let plant = plant_service::load_plant(plant_path)?;
    let pacing = rtf.or(plant.run.real_time_factor).or(Some(1.0));
    let service = SimulationService::spawn(plant.engine, pacing)?;
    println!(
        "Live session {} for '{}' (real-time factor {:.1})",
        service.session_id(),
        plant.name,
        pacing.unwrap_or(1.0)
    );

    if let Some(target_w) = power {
        service.update(ParameterUpdate::GeneratorSetpoint {
            setpoint: GeneratorSetpoint::Power { target_w },
        })?;
    }
    service.start()?;
    info!(session_id = %service.session_id(), "live session running");

    let deadline = Instant::now() + Duration::from_secs_f64(seconds);
    let interval = Duration::from_millis(interval_ms.max(10));
    while Instant::now() < deadline {
        thread::sleep(interval);
        if let Some(snapshot) = service.slot().take() {
            print_live_line(&snapshot);
        }
        if service.state() == ServiceState::Halted {
            println!("Engine halted: {:?}", service.latest().map(|s| s.status));
            break;
        }
    }

    let dropped = service.slot().dropped();
    let last = service.latest();
    service.shutdown()?;
    if let Some(snapshot) = last {
        println!(
            "Stopped at t={:.2} s after {} ticks ({} snapshots not displayed)",
            snapshot.time_s, snapshot.tick, dropped
        );
    }
    Ok(())
}

fn print_live_line(s: &TickSnapshot) {
    println!(
        "t={:>8.2}s  {:>6.1} rpm  {:>7.2} kW  clutch={:.2}  tank={:.2} bar  full={}/{}  closure={:.1e}",
        s.time_s,
        rpm(rad_per_s(s.omega_rad_s)),
        kw(watts(s.generator_power_w)),
        s.clutch_engagement,
        bar(pa(s.tank_pressure_pa)),
        s.count_in_state(FloaterState::Full),
        s.floaters.len(),
        s.closure_error()
    );
}
