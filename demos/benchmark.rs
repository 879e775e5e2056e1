#[macro_use]
extern crate log;

use getopts::Options;
use statmic::{
    data::PointValue, AggregationType, Measure, MetricsContext, Stats, TagKey, TagMap, TagValue,
};
use std::{
    env, thread,
    time::{Duration, Instant},
};

struct Generator {
    stats: Stats,
    latency: Measure,
    tags: TagMap,
    t0: Option<Instant>,
}

impl Generator {
    fn new(stats: Stats, latency: Measure, tags: TagMap) -> Generator {
        Generator {
            stats,
            latency,
            tags,
            t0: None,
        }
    }

    fn run(&mut self) {
        loop {
            let t1 = Instant::now();
            if let Some(t0) = self.t0 {
                let elapsed = duration_as_nanos(t1 - t0);
                self.stats.record(&[self.latency.measurement(elapsed)], Some(&self.tags));
            }
            self.t0 = Some(t1);
        }
    }
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("p", "producers", "number of producers", "INTEGER");
    opts.optopt("d", "duration", "number of seconds to run for", "INTEGER");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn parse_opt(matches: &getopts::Matches, name: &str, default: usize) -> Option<usize> {
    match matches.opt_str(name) {
        None => Some(default),
        Some(s) => match s.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                error!("invalid value for --{}: {}", name, e);
                None
            },
        },
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            return;
        },
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    info!("statmic benchmark");

    let (producers, duration) = match (
        parse_opt(&matches, "producers", 1),
        parse_opt(&matches, "duration", 60),
    ) {
        (Some(p), Some(d)) => (p, d),
        _ => return,
    };

    info!("producers: {}", producers);
    info!("duration: {}s", duration);

    let context = MetricsContext::new();
    let stats = context.stats().clone();

    let setup = || -> statmic::Result<(Measure, TagKey)> {
        let latency = stats.create_measure_double("loop_latency", "ns", "time between two recordings")?;
        let worker = TagKey::new("worker")?;
        stats.create_and_register_view(
            "loop_latency_distribution",
            &latency,
            AggregationType::Distribution,
            vec![worker.clone()],
            "distribution of loop latencies",
            Some(vec![50.0, 100.0, 250.0, 500.0, 1000.0, 10_000.0]),
        )?;
        stats.create_and_register_view(
            "loop_latency_count",
            &latency,
            AggregationType::Count,
            Vec::new(),
            "number of recordings",
            None,
        )?;
        Ok((latency, worker))
    };

    let (latency, worker) = match setup() {
        Ok(v) => v,
        Err(e) => {
            error!("failed to set up views: {}", e);
            return;
        },
    };

    info!("views registered");

    // Spin up our sample producers.
    for i in 0..producers {
        let value = match TagValue::new(i.to_string()) {
            Ok(v) => v,
            Err(e) => {
                error!("invalid worker tag: {}", e);
                return;
            },
        };
        let mut tags = TagMap::new();
        tags.set(worker.clone(), value);

        let mut generator = Generator::new(stats.clone(), latency.clone(), tags);
        thread::spawn(move || generator.run());
    }

    // Poll the producers to figure out the sample rate.
    let mut total = 0;
    let mut t0 = Instant::now();
    for _ in 0..duration {
        thread::sleep(Duration::new(1, 0));
        let t1 = Instant::now();

        let mut turn_total = 0;
        let mut series = 0;
        for producer in context.producer_manager().get_all_metric_producers() {
            for metric in producer.get_metrics() {
                series += metric.timeseries.len();
                if metric.descriptor.name != "loop_latency_count" {
                    continue;
                }
                for ts in &metric.timeseries {
                    if let Some(PointValue::Int64(n)) = ts.points.last().map(|p| &p.value) {
                        turn_total += *n;
                    }
                }
            }
        }

        let turn_delta = turn_total - total;
        total = turn_total;
        let rate = turn_delta as f64 / (duration_as_nanos(t1 - t0) / 1_000_000_000.0);

        info!("rate: {} samples per second across {} series", rate, series);

        t0 = t1;
    }

    info!("total measurements recorded: {}", total);
}

fn duration_as_nanos(d: Duration) -> f64 {
    (d.as_secs() as f64 * 1e9) + f64::from(d.subsec_nanos())
}
