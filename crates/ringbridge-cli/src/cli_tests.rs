use clap::CommandFactory;

use crate::Cli;

#[test]
fn settle_help_mentions_run_loop_stall() {
    let help = Cli::command().render_long_help().to_string();
    let help = help.split_whitespace().collect::<Vec<_>>().join(" ");

    assert!(help.contains("--settle-ms"));
    assert!(help.contains("does not react to ctrl-c"), "{help}");
}
