use refcheck::api::{ApiLevel, ApiLevelsDatabase};
use refcheck::config::ConfigFiles;
use refcheck::dex::*;
use refcheck::loader::load_manifest_file;
use refcheck::ref_checker::RefChecker;
use refcheck::store::XStoreRefs;
use refcheck::Error;

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process;

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("Cross-store reference checker")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Check whether code in a store may refer to types, methods, and fields")
        .arg(
            Arg::new("symbols")
                .long("symbols")
                .value_name("FILE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON manifest of the stores and classes in the program"),
        )
        .arg(
            Arg::new("api levels")
                .long("api-levels")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Platform API levels listing (overrides `api_levels` in the config)"),
        )
        .arg(
            Arg::new("min sdk")
                .long("min-sdk")
                .value_name("LEVEL")
                .value_parser(value_parser!(u32))
                .help("Minimum API level (overrides `min_sdk` in the config)"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("NAME")
                .help("Store whose code makes the references (overrides `store` in the config)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("JSON optimizer configuration"),
        )
        .arg(
            Arg::new("SYMBOL")
                .help("Type descriptor (`Lfoo/Bar;`), method (`Lfoo/Bar;.m:(I)V`), or field (`Lfoo/Bar;.f:I`)")
                .required(true)
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(config_file) => Some(ConfigFiles::parse(config_file)?),
        None => None,
    };
    let min_sdk = match matches.get_one::<u32>("min sdk") {
        Some(min_sdk) => ApiLevel(*min_sdk),
        None => config.as_ref().map_or(ApiLevel(0), ConfigFiles::min_sdk),
    };
    let store_name = match matches.get_one::<String>("store") {
        Some(store_name) => store_name.clone(),
        None => config.as_ref().map_or_else(
            || String::from(refcheck::store::ROOT_STORE_NAME),
            |config| config.store_name().to_owned(),
        ),
    };
    let api_levels_file = matches
        .get_one::<PathBuf>("api levels")
        .cloned()
        .or_else(|| config.as_ref().and_then(ConfigFiles::api_levels_path));

    let api = match api_levels_file {
        Some(api_levels_file) => ApiLevelsDatabase::parse(api_levels_file)?,
        None => {
            log::warn!("No API levels given: only classes in the stores can be valid");
            ApiLevelsDatabase::default()
        }
    };

    let class_graph_arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&class_graph_arenas);
    let symbols_file = matches.get_one::<PathBuf>("symbols").unwrap();
    log::info!("Loading symbols from '{}'", symbols_file.display());
    let stores = load_manifest_file(&class_graph, symbols_file)?;
    let xstores = XStoreRefs::new(&stores)?;

    if let Some(config) = &config {
        let resolved = config.resolve(&class_graph);
        log::info!(
            "Config mentions {} pure methods and {} no-optimization annotations",
            resolved.pure_methods.len(),
            resolved.no_optimizations_annos.len()
        );
    }

    let store_idx = xstores
        .get_store_idx_by_name(&store_name)
        .ok_or_else(|| Error::UnknownStore(store_name.clone()))?;
    let checker = RefChecker::new(&xstores, store_idx, min_sdk, &api);

    let mut all_valid = true;
    for symbol in matches.get_many::<String>("SYMBOL").into_iter().flatten() {
        let valid = check_symbol(&checker, &class_graph, symbol)?;
        println!("{}\t{}", symbol, if valid { "valid" } else { "invalid" });
        all_valid &= valid;
    }

    let stats = checker.cache_stats();
    log::debug!(
        "Memoized {} types, {} methods, {} fields",
        stats.types,
        stats.methods,
        stats.fields
    );

    if !all_valid {
        process::exit(1);
    }
    Ok(())
}

/// Check one symbol from the command line
///
/// Symbols the manifest doesn't mention are added to the graph (as references), so that library
/// members can be checked against the API levels listing.
fn check_symbol<'g>(
    checker: &RefChecker<'_>,
    class_graph: &'g ClassGraph<'g>,
    symbol: &str,
) -> Result<bool, Error> {
    if !symbol.contains(':') {
        let typ = FieldType::<BinaryName>::parse(symbol)
            .map_err(|err| Error::bad_descriptor(symbol, err))?;
        return Ok(checker.check_type(&class_graph.resolve_type(&typ)));
    }

    let member = MemberRef::parse(symbol).map_err(|err| Error::bad_descriptor(symbol, err))?;
    let class = class_graph.class_ref(&member.class);
    match &member.kind {
        MemberKind::Method(descriptor) => {
            let method = match class_graph.lookup_method(&member) {
                Some(method) => method,
                None => class_graph.add_method(
                    class,
                    member.name.clone(),
                    descriptor.try_map(|name| Ok::<_, Error>(class_graph.class_ref(name)))?,
                    MethodAccessFlags::empty(),
                ),
            };
            Ok(checker.check_method(method))
        }
        MemberKind::Field(field_type) => {
            let field = match class_graph.lookup_field(&member) {
                Some(field) => field,
                None => class_graph.add_field(
                    class,
                    member.name.clone(),
                    class_graph.resolve_type(field_type),
                    FieldAccessFlags::empty(),
                ),
            };
            Ok(checker.check_field(field))
        }
    }
}
