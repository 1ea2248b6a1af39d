use clap::Parser;
use clap_complete::Shell;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    ikernel completions bash > ~/.bash_completion.d/ikernel\n\n\
                  Generate zsh completions:\n    ikernel completions zsh > ~/.zfunc/_ikernel\n\n\
                  Generate fish completions:\n    ikernel completions fish > ~/.config/fish/completions/ikernel.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(value_enum, ignore_case = true)]
    pub shell: Shell,
}
