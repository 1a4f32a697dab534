use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use policy_codex_core::{DocumentationAssembler, LoadedRuleset, Ruleset, ValidationReport};

use super::{
    print_branches, print_doc_lines, print_help, print_policy, print_report, print_statement,
    print_templates,
};

/// Whether the loop keeps reading input after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Context<'a> {
    loaded: &'a LoadedRuleset,
    assembler: DocumentationAssembler,
}

impl<'a> Context<'a> {
    pub fn new(loaded: &'a LoadedRuleset) -> Self {
        Self {
            loaded,
            assembler: DocumentationAssembler::new(loaded.ruleset.clone()),
        }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.loaded.ruleset
    }

    pub fn report(&self) -> &ValidationReport {
        &self.loaded.report
    }

    pub fn assembler(&self) -> &DocumentationAssembler {
        &self.assembler
    }
}

pub struct Args<'a> {
    tokens: Vec<&'a str>,
    index: usize,
}

impl<'a> Args<'a> {
    pub fn new(tokens: Vec<&'a str>) -> Self {
        Self { tokens, index: 0 }
    }

    /// Remaining tokens joined by single spaces, for multi-word names.
    pub fn rest(&mut self) -> Option<String> {
        if self.index >= self.tokens.len() {
            return None;
        }
        let value = self.tokens[self.index..].join(" ");
        self.index = self.tokens.len();
        Some(value)
    }

    pub fn rest_required(&mut self, message: &str) -> Result<String> {
        self.rest().ok_or_else(|| anyhow!(message.to_owned()))
    }
}

pub trait Command {
    fn name() -> &'static str;
    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<Flow>;
}

type CommandFn = for<'a, 'i> fn(&mut Context<'a>, Args<'i>) -> Result<Flow>;

pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: Command>(&mut self) {
        let name = C::name();
        if self.handlers.insert(name, C::execute).is_some() {
            panic!("重複したコマンド登録です: {name}");
        }
    }

    pub fn dispatch(&self, command: &str, ctx: &mut Context<'_>, args: Args<'_>) -> Result<Flow> {
        if let Some(handler) = self.handlers.get(command) {
            handler(ctx, args)
        } else {
            bail!("未対応のコマンドです: {command}. help で一覧を確認してください。");
        }
    }

    pub fn execute_input(&self, ctx: &mut Context<'_>, input: &str) -> Result<Flow> {
        let mut parts = input.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(anyhow!("コマンドが指定されていません。"));
        };
        let command_name = head.to_ascii_lowercase();
        let args = Args::new(parts.collect());
        self.dispatch(command_name.as_str(), ctx, args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register::<HelpCommand>();
        registry.register::<HelpAliasCommand>();
        registry.register::<BranchesCommand>();
        registry.register::<ShowCommand>();
        registry.register::<DocCommand>();
        registry.register::<ValidateCommand>();
        registry.register::<ParseCommand>();
        registry.register::<TemplatesCommand>();
        registry.register::<QuitCommand>();
        registry.register::<ExitCommand>();
        registry
    }
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name() -> &'static str {
        "help"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<Flow> {
        print_help();
        Ok(Flow::Continue)
    }
}

pub struct HelpAliasCommand;

impl Command for HelpAliasCommand {
    fn name() -> &'static str {
        "?"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<Flow> {
        HelpCommand::execute(ctx, args)
    }
}

pub struct BranchesCommand;

impl Command for BranchesCommand {
    fn name() -> &'static str {
        "branches"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<Flow> {
        print_branches(ctx.ruleset());
        Ok(Flow::Continue)
    }
}

pub struct ShowCommand;

impl Command for ShowCommand {
    fn name() -> &'static str {
        "show"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<Flow> {
        let name = args.rest_required("ポリシー名を指定してください。")?;
        let policy = ctx
            .ruleset()
            .policy(&name)
            .ok_or_else(|| anyhow!("ポリシーが見つかりません: {name}"))?;
        print_policy(ctx.ruleset(), policy);
        Ok(Flow::Continue)
    }
}

pub struct DocCommand;

impl Command for DocCommand {
    fn name() -> &'static str {
        "doc"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<Flow> {
        let name = args.rest_required("ポリシー名またはブランチ名を指定してください。")?;
        let lines = ctx
            .assembler()
            .document(&name)
            .ok_or_else(|| anyhow!("ポリシーまたはブランチが見つかりません: {name}"))?;
        print_doc_lines(&lines);
        Ok(Flow::Continue)
    }
}

pub struct ValidateCommand;

impl Command for ValidateCommand {
    fn name() -> &'static str {
        "validate"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<Flow> {
        let branch = args.rest();
        if let Some(name) = branch.as_deref() {
            if ctx.ruleset().branch(name).is_none() {
                bail!("ブランチが見つかりません: {name}");
            }
        }
        print_report(ctx.report(), branch.as_deref());
        Ok(Flow::Continue)
    }
}

pub struct ParseCommand;

impl Command for ParseCommand {
    fn name() -> &'static str {
        "parse"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<Flow> {
        let sentence = args.rest_required("解析するユニーク文を指定してください。")?;
        let statement = ctx.ruleset().templates().parse(&sentence)?;
        print_statement(&statement, 0);
        Ok(Flow::Continue)
    }
}

pub struct TemplatesCommand;

impl Command for TemplatesCommand {
    fn name() -> &'static str {
        "templates"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<Flow> {
        print_templates(ctx.ruleset().templates());
        Ok(Flow::Continue)
    }
}

pub struct QuitCommand;

impl Command for QuitCommand {
    fn name() -> &'static str {
        "quit"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<Flow> {
        println!("終了します。");
        Ok(Flow::Quit)
    }
}

pub struct ExitCommand;

impl Command for ExitCommand {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<Flow> {
        QuitCommand::execute(ctx, args)
    }
}
