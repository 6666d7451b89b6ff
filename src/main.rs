//! Stencil's main application entry point.
//! Parses arguments, assembles the scaffold tree and runs it against the
//! local filesystem.

use stencil::{
    app::{new_app, AppOptions},
    cli::{get_args, Args},
    config::get_config,
    context::OutputContext,
    error::{default_error_handler, StencilResult},
    fs::OsFs,
    logger::init_logger,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the optional configuration from the working directory
/// 2. Builds the application generator tree
/// 3. Runs it, printing one report line per touched file
fn run(args: Args) -> StencilResult<()> {
    let config = get_config(&args.work_dir)?;

    let mut deps = config.dependencies.clone();
    deps.extend(args.deps);

    let options = AppOptions {
        name: args.name,
        deps,
        format: args.fmt,
        template: args.template,
        vars: config.vars(),
    };
    let tree = new_app(&options)?;

    let mut ctx = OutputContext::new(OsFs::new(), &args.work_dir)
        .overwrite(args.overwrite)
        .dry_run(args.dry_run);
    ctx.run(&tree)
}
