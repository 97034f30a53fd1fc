use clap::Parser;
use clap::ValueEnum;
use scatter_table::FixedScatterTable;
use scatter_table::hashing::DefaultHashBuilder;
use scatter_table::hashing::IdentityHashBuilder;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Hasher {
    /// The crate's default hash builder.
    Default,
    /// Keys used as their own hash.
    Identity,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fill level in percent of capacity.
    #[arg(short = 'l', long = "load", default_value_t = 100)]
    load: usize,

    /// Spacing between consecutive keys.
    #[arg(short = 's', long = "stride", default_value_t = 1)]
    stride: u64,

    #[arg(long = "hasher", value_enum, default_value_t = Hasher::Default)]
    hasher: Hasher,
}

fn run<S>(args: &Args, hash_builder: S)
where
    S: core::hash::BuildHasher,
{
    let mut table: FixedScatterTable<u64, u64, S> =
        match FixedScatterTable::with_capacity_and_hasher(args.target_capacity, hash_builder) {
            Ok(table) => table,
            Err(err) => {
                eprintln!("cannot create table: {err}");
                std::process::exit(1);
            }
        };

    println!("Actual capacity: {}", table.capacity());

    let count = table.capacity() * args.load.min(100) / 100;
    println!("Filling table with {count} keys (stride {})...", args.stride);

    for i in 0..count as u64 {
        let key = i.wrapping_mul(args.stride);
        if let Err(err) = table.put(key, i) {
            eprintln!("put({key}) failed: {err}");
            break;
        }
    }

    println!("Inserted {} values into table", table.len());
    if let Err(err) = table.check() {
        eprintln!("table is inconsistent: {err}");
        std::process::exit(1);
    }

    table.chain_stats().print();
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating FixedScatterTable with target capacity: {}",
        args.target_capacity
    );

    match args.hasher {
        Hasher::Default => run(&args, DefaultHashBuilder::default()),
        Hasher::Identity => run(&args, IdentityHashBuilder::default()),
    }
}
