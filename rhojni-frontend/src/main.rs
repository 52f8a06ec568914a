use clap::{Parser, Subcommand};
use rhojni::{
    jni::{
        decode::PackageRewrite,
        name::{make_long_native_method_name, make_native_method_name},
    },
    registry::{NativeMethodInfo, NativeMethodTable, ACC_NATIVE},
    ResolverConfig, SymbolResolver,
};
use rhojni_base::{
    class_name::dotted_to_internal, parse_java_type_name, DescriptorType, MethodDescriptor,
};
use tracing_subscriber::layer::SubscriberExt;

mod formatter;
mod util;

#[derive(Debug, Parser)]
#[clap(name = "RhoJNI (Frontend)")]
#[clap(version = "0.1.0")]
#[clap(about = "Decode and produce JNI native method symbols and type descriptors")]
#[clap(propagate_version = true)]
struct CliArgs {
    #[clap(subcommand)]
    command: CliCommands,
}

#[derive(Debug, Subcommand)]
enum CliCommands {
    /// Decode native symbols into the class, method, and descriptor they implement
    Decode {
        /// A native method that exists, `com/foo/Bar.open=(I)V`
        #[clap(long = "native", value_name = "CLASS.METHOD=DESC")]
        natives: Vec<String>,
        /// The package which classes are expected to live in, `org.bridj.v0_7`
        #[clap(long, value_name = "PACKAGE")]
        package: Option<String>,
        /// The last part of the package, if it is versioned, `v0_7`
        #[clap(long, value_name = "SUB_PACKAGE", requires = "package")]
        version_sub_package: Option<String>,
        #[clap(value_name = "SYMBOL", required = true)]
        symbols: Vec<String>,
    },
    /// Produce the symbol name that a native method would be exported as
    Mangle {
        #[clap(value_name = "CLASS_NAME")]
        class_name: String,
        #[clap(value_name = "METHOD_NAME")]
        method_name: String,
        /// Produce the long (overloaded) name using this descriptor
        #[clap(long, value_name = "DESC")]
        descriptor: Option<String>,
    },
    /// Encode java type names, `int[]` or `java.lang.String`, into descriptors
    Encode {
        /// Treat the types as the parameters of a single method
        #[clap(long)]
        method: bool,
        /// The return type used with `--method`
        #[clap(long, value_name = "TYPE", default_value = "void")]
        returns: String,
        /// Print the internal name (as used by `FindClass`) rather than the descriptor
        #[clap(long, conflicts_with = "method")]
        internal_name: bool,
        #[clap(value_name = "TYPE")]
        types: Vec<String>,
    },
}

struct EmptyWriter;
impl std::io::Write for EmptyWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn make_log_file() -> std::io::Result<std::sync::Arc<std::fs::File>> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("./rhojni.log")?;
    Ok(std::sync::Arc::new(log_file))
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name).map(|x| x != "0").unwrap_or(default)
}

fn init_logging(conf: &ResolverConfig) {
    let should_log_console = env_flag("RHOJNI_LOG_CONSOLE", true);
    let should_log_file = env_flag("RHOJNI_LOG_FILE", false);

    let console_layer = if should_log_console {
        Some(
            tracing_subscriber::fmt::Layer::default()
                .with_writer(std::io::stderr)
                .without_time()
                .event_format(formatter::Formatter),
        )
    } else {
        None
    };
    let file_layer = if should_log_file {
        match make_log_file() {
            Ok(log_file) => Some(
                tracing_subscriber::fmt::Layer::default()
                    .with_writer(log_file)
                    .without_time()
                    .event_format(formatter::Formatter),
            ),
            Err(err) => {
                eprintln!("Failed to open log file: {}", err);
                None
            }
        }
    } else {
        None
    };

    let t_subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(conf.tracing_level)
        .without_time()
        .event_format(formatter::Formatter)
        .with_writer(|| EmptyWriter)
        .finish()
        .with(console_layer)
        .with(file_layer);

    if let Err(err) = tracing::subscriber::set_global_default(t_subscriber) {
        eprintln!("Failed to set global default tracing subscriber: {}", err);
    }
}

fn main() {
    // Note that clap autoexits if it didn't get a thing to do
    let args = CliArgs::parse();

    let success = match args.command {
        CliCommands::Decode {
            natives,
            package,
            version_sub_package,
            symbols,
        } => execute_decode(
            &natives,
            package.as_deref(),
            version_sub_package.as_deref(),
            &symbols,
        ),
        CliCommands::Mangle {
            class_name,
            method_name,
            descriptor,
        } => {
            execute_mangle(&class_name, &method_name, descriptor.as_deref());
            true
        }
        CliCommands::Encode {
            method,
            returns,
            internal_name,
            types,
        } => {
            init_logging(&ResolverConfig::new());
            if method {
                execute_encode_method(&types, &returns)
            } else {
                execute_encode_types(&types, internal_name)
            }
        }
    };

    if !success {
        std::process::exit(1);
    }
}

fn execute_decode(
    natives: &[String],
    package: Option<&str>,
    version_sub_package: Option<&str>,
    symbols: &[String],
) -> bool {
    let mut conf = ResolverConfig::new();
    if let Some(package) = package {
        conf = conf.with_package_rewrite(PackageRewrite::versioned(package, version_sub_package));
    }

    init_logging(&conf);

    let natives = match util::parse_key_val_properties(natives) {
        Ok(natives) => natives,
        Err(entry) => {
            tracing::error!("Expected --native of the form CLASS.METHOD=DESC, got: {}", entry);
            return false;
        }
    };

    let mut table = NativeMethodTable::new();
    for (key, descriptor) in natives {
        let (class_name, method_name) = if let Some(split) = util::split_class_method(&key) {
            split
        } else {
            tracing::error!("Expected CLASS.METHOD in --native, got: {}", key);
            return false;
        };
        table.insert(
            class_name,
            NativeMethodInfo::new(ACC_NATIVE, method_name, descriptor),
        );
    }

    tracing::info!("Decoding with natives of {} classes", table.len());

    let resolver = SymbolResolver::new(conf, table);

    let mut success = true;
    for symbol in symbols {
        match resolver.decode_versioned_symbol(symbol) {
            Ok(decoded) => println!(
                "{}.{} {}",
                decoded.internal_class_name, decoded.method_name, decoded.descriptor
            ),
            Err(err) => {
                tracing::error!("Failed to decode {}: {}", symbol, err);
                success = false;
            }
        }
    }

    success
}

fn execute_mangle(class_name: &str, method_name: &str, descriptor: Option<&str>) {
    let class_name = dotted_to_internal(class_name);
    let symbol = match descriptor {
        Some(descriptor) => make_long_native_method_name(&class_name, method_name, descriptor),
        None => make_native_method_name(&class_name, method_name),
    };

    println!("{}", symbol);
}

fn execute_encode_types(types: &[String], as_internal_name: bool) -> bool {
    let mut success = true;
    for name in types {
        match util::encode_type_name(name, as_internal_name) {
            Ok(encoded) => println!("{}", encoded),
            Err(err) => {
                tracing::error!("Bad type name {}: {}", name, err);
                success = false;
            }
        }
    }

    success
}

fn execute_encode_method(types: &[String], returns: &str) -> bool {
    let return_type = match parse_java_type_name(returns) {
        Ok(return_type) => return_type,
        Err(err) => {
            tracing::error!("Bad return type {}: {}", returns, err);
            return false;
        }
    };

    let mut parameters: Vec<DescriptorType> = Vec::with_capacity(types.len());
    for name in types {
        match parse_java_type_name(name) {
            Ok(Some(typ)) => parameters.push(typ),
            Ok(None) => {
                tracing::error!("void is not a valid parameter type");
                return false;
            }
            Err(err) => {
                tracing::error!("Bad parameter type {}: {}", name, err);
                return false;
            }
        }
    }

    let descriptor = MethodDescriptor::new(parameters, return_type);
    println!("{}", descriptor.to_desc_string());
    true
}
