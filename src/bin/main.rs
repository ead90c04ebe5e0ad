use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::exit;

use songchart::midi::core::create_smf;
use songchart::midi::time::DEFAULT_TICKS_PER_BEAT;
use songchart::{parse_reader, Chart, Voice};

use clap::*;

#[derive(Debug, Parser)]
#[command(name = "songchart")]
#[command(version = "0.1")]
#[command(about = "Validates a karaoke song chart and prints its voices", long_about = None)]
struct Cli {
    /// Chart file, UTF-8 encoded
    file: PathBuf,

    /// Declared voice identifier, exactly as its switch line reads (e.g. P1). Repeat for duets.
    #[arg(short = 'p', long = "voice")]
    voices: Vec<String>,

    /// Write a MIDI preview of the pitched notes
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_TICKS_PER_BEAT, value_parser = clap::value_parser!(u16).range(1..=0x7FFF))]
    ticks_per_beat: u16,

    /// Tempo written into the MIDI preview
    #[arg(long)]
    bpm: Option<u32>,
}

fn voice_summary(key: &str, voice: &Voice) -> String {
    let name = if key.is_empty() { "(solo)" } else { key };
    match (voice.start_beat(), voice.end_beat()) {
        (Some(start), Some(end)) => format!(
            "{}: {} sentences, {} notes, beats {}..{}",
            name,
            voice.sentences().len(),
            voice.note_count(),
            start,
            end
        ),
        _ => format!("{}: empty", name),
    }
}

fn print_chart(chart: &Chart) {
    for key in chart.sorted_keys() {
        if let Some(voice) = chart.voice(key) {
            println!("{}", voice_summary(key, voice));
        }
    }
}

fn main() {
    env_logger::init();
    let Cli {
        file,
        voices,
        output,
        ticks_per_beat,
        bpm,
    } = Cli::parse();

    let reader = match File::open(&file) {
        Ok(f) => BufReader::new(f),
        Err(e) => {
            eprintln!("Failed to open {}: {}", file.display(), e);
            exit(1)
        }
    };

    let chart = match parse_reader(reader, &voices) {
        Ok(chart) => chart,
        Err(e) => {
            eprintln!("{}: {}", file.display(), e);
            exit(1)
        }
    };
    print_chart(&chart);

    if let Some(path) = output {
        match create_smf(&chart, ticks_per_beat, bpm).save(&path) {
            Ok(_) => println!("{} was written successfully", path.display()),
            Err(e) => {
                eprintln!("Failed to write {}: {}", path.display(), e);
                exit(1)
            }
        }
    }
}

#[test]
fn test_voice_summary() {
    let chart = songchart::parse_lines([": 0 4 60 la", "- 4", ": 6 2 60 na"], &[] as &[&str]).unwrap();
    assert_eq!(
        voice_summary("", chart.solo().unwrap()),
        "(solo): 2 sentences, 2 notes, beats 0..8"
    );
    assert_eq!(voice_summary("P2", &Voice::default()), "P2: empty");
}

#[test]
fn test_cli_args() {
    let cli = Cli::try_parse_from(["songchart", "song.txt", "-p", "P1", "--voice", "P2", "-o", "x.mid"]).unwrap();
    assert_eq!(cli.voices, vec!["P1", "P2"]);
    assert_eq!(cli.ticks_per_beat, DEFAULT_TICKS_PER_BEAT);
    assert!(Cli::try_parse_from(["songchart", "song.txt", "--ticks-per-beat", "0"]).is_err());
}
