use anyhow::{bail, Context, Result};
use bloomlog_core::{hash, BloomFilter, FilterConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bloomlog", about = "bloomlog CLI: offline filter ops")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create an empty filter and dump it.
    Create {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, required_unless_present = "config")]
        max: Option<u64>,
        #[arg(long, default_value_t = 0.01)]
        fpp: f64,
        /// JSON FilterConfig; overrides --max/--fpp
        #[arg(long)]
        config: Option<PathBuf>,
        /// Replace an existing dump
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Insert keys into a dumped filter and dump it again.
    Put {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        name: String,
        /// Record new keys in <LOG_DIR>/bloomlog.aof
        #[arg(long)]
        log_dir: Option<PathBuf>,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    Contains {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    Info {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Also print the raw bitmap words
        #[arg(long, default_value_t = false)]
        bits: bool,
    },

    /// Print sizing for a capacity / false-positive rate without touching disk.
    Estimate {
        #[arg(long)]
        max: u64,
        #[arg(long, default_value_t = 0.01)]
        fpp: f64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p)?;
    Ok(())
}

fn load(dir: &Path, name: &str) -> Result<BloomFilter> {
    BloomFilter::load(dir, name).with_context(|| format!("load {name} from {}", dir.display()))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Create { dir, name, max, fpp, config, force } => {
            ensure_dir(&dir)?;
            if !force && dir.join(format!("{name}.meta")).exists() {
                bail!("{name} already exists in {} (use --force)", dir.display());
            }
            let cfg = match (config, max) {
                (Some(p), _) => FilterConfig::load(&p).with_context(|| format!("config {}", p.display()))?,
                (None, Some(max)) => FilterConfig::new(max, fpp),
                (None, None) => bail!("--max or --config required"),
            };
            let bf = BloomFilter::with_config(cfg)?;
            bf.dump(&dir, &name)?;
            println!("created: {name} {}", bf.meta());
        }
        Cmd::Put { dir, name, log_dir, keys } => {
            let bf = match &log_dir {
                Some(l) => {
                    ensure_dir(l)?;
                    BloomFilter::load_with_log(&dir, &name, l)
                        .with_context(|| format!("load {name} from {}", dir.display()))?
                }
                None => load(&dir, &name)?,
            };
            bf.initialize()?;
            for k in &keys {
                let state = if bf.put(k) { "present" } else { "new" };
                println!("{k}\t{state}");
            }
            bf.close();
            bf.dump(&dir, &name)?;
        }
        Cmd::Contains { dir, name, keys } => {
            let bf = load(&dir, &name)?;
            for k in &keys {
                println!("{k}\t{}", bf.contains(k));
            }
        }
        Cmd::Info { dir, name, json, bits } => {
            let bf = load(&dir, &name)?;
            let meta = bf.meta();
            if json {
                println!("{}", serde_json::to_string_pretty(&meta)?);
            } else {
                println!("max_elements : {}", meta.max_elements);
                println!("hash_size    : {}", meta.hash_size);
                println!("bit_size     : {}", meta.bit_size);
                println!("total        : {}", meta.total);
                println!("est. fpp     : {:.6}", bf.estimated_fpp());
            }
            if bits {
                bf.render(&mut std::io::stdout().lock())?;
            }
        }
        Cmd::Estimate { max, fpp } => {
            FilterConfig::new(max, fpp).validate()?;
            let m = hash::bit_size(max, fpp);
            let k = hash::hash_size(m, max);
            println!("bit_size={m} hash_size={k} bytes={}", m.div_ceil(32) * 4);
        }
    }
    Ok(())
}
