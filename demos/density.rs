use anyhow::{bail, Context, Result};
use sequitur_ts::{run, IntervalTable, PipelineConfig, RuleTable};
use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

/// Computes the Sequitur rule density curve of a numeric series.
///
/// Usage: cargo run --example density <data file> <window> <paa> <alphabet> <out prefix>
///
/// Writes one coverage count per line to `<out prefix>_SEQUITUR_density_curve.txt`
/// and a per-rule summary to `<out prefix>_sequitur_grammar_stat.txt`.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 6 {
        eprintln!(
            "Usage: {} <data file> <window> <paa> <alphabet> <out prefix>",
            args[0]
        );
        std::process::exit(1);
    }

    let data_file = &args[1];
    let window: usize = args[2].parse().context("window size must be an integer")?;
    let paa: usize = args[3].parse().context("PAA size must be an integer")?;
    let alphabet: usize = args[4].parse().context("alphabet size must be an integer")?;
    let prefix = &args[5];

    let series = load_series(data_file)?;
    log::info!("read {} samples from {}", series.len(), data_file);

    let config = PipelineConfig::new(window, paa, alphabet);
    let output = run(&series, &config)?;

    let curve_path = format!("{}_SEQUITUR_density_curve.txt", prefix);
    let mut curve = BufWriter::new(
        File::create(&curve_path).with_context(|| format!("cannot create {}", curve_path))?,
    );
    for count in output.coverage.as_slice() {
        writeln!(curve, "{}", count)?;
    }
    curve.flush()?;

    let stats_path = format!("{}_sequitur_grammar_stat.txt", prefix);
    write_rule_stats(&stats_path, &config, &output.rules, &output.intervals)?;

    println!("Tokens: {}", output.token_count);
    println!("Rules: {} ({} after pruning)", output.rules.len(), output.pruned.len());
    println!(
        "Grammar size: {:.2}% of input",
        output.stats.compression_ratio()
    );
    println!(
        "Coverage: max {}, {} of {} samples uncovered",
        output.coverage.max(),
        output.coverage.uncovered(),
        output.coverage.len()
    );
    println!("Wrote {} and {}", curve_path, stats_path);

    Ok(())
}

/// Reads whitespace-separated numbers, any number per line.
fn load_series(path: &str) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?;
    let mut series = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        for field in line.split_whitespace() {
            let value: f64 = field
                .parse()
                .with_context(|| format!("line {}: not a number: {:?}", line_no + 1, field))?;
            series.push(value);
        }
    }
    if series.is_empty() {
        bail!("{} contains no samples", path);
    }
    Ok(series)
}

fn write_rule_stats(
    path: &str,
    config: &PipelineConfig,
    rules: &RuleTable,
    intervals: &IntervalTable,
) -> Result<()> {
    let mut out =
        BufWriter::new(File::create(path).with_context(|| format!("cannot create {}", path))?);
    writeln!(out, "# sliding window: {}", config.window_size)?;
    writeln!(out, "# paa size: {}", config.paa_size)?;
    writeln!(out, "# alphabet size: {}", config.alphabet_size)?;

    // Only the retained rules carry intervals
    for record in rules {
        writeln!(out, "/// {}", record.rule_name())?;
        writeln!(
            out,
            "{} -> '{}', expanded rule string: '{}'",
            record.rule_name(),
            record.rule_string(),
            record.expanded_rule_string()
        )?;
        writeln!(out, "subsequences starts: {:?}", record.occurrences)?;
        if let Some(rule_intervals) = intervals.get(record.rule_id) {
            let lengths: Vec<usize> = rule_intervals.intervals.iter().map(|i| i.len()).collect();
            writeln!(out, "subsequences lengths: {:?}", lengths)?;
            if let (Some(min), Some(max), Some(mean)) = (
                rule_intervals.min_length(),
                rule_intervals.max_length(),
                rule_intervals.mean_length(),
            ) {
                writeln!(out, "min length {}", min)?;
                writeln!(out, "max length {}", max)?;
                writeln!(out, "mean length {:.2}", mean)?;
            }
        }
        writeln!(out, "rule occurrence frequency {}", record.occurrence_count())?;
        writeln!(out, "rule use frequency {}", record.use_frequency)?;
        writeln!(out, "rule level {}", record.level)?;
    }
    out.flush()?;
    Ok(())
}
