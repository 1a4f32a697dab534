mod commands;

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};
use policy_codex_core::{
    DocLine, LoadedRuleset, Policy, Ruleset, Severity, TemplateTable, UniqueEntry,
    UniqueStatement, ValidationReport,
};

use commands::{CommandRegistry, Context, Flow};

pub fn run(loaded: &LoadedRuleset) -> Result<()> {
    print_intro(loaded);
    let registry = CommandRegistry::default();
    let mut ctx = Context::new(loaded);
    let stdin = io::stdin();

    loop {
        print!("codex> ");
        io::stdout()
            .flush()
            .context("プロンプトのフラッシュに失敗しました")?;

        let mut line = String::new();
        let bytes = stdin
            .lock()
            .read_line(&mut line)
            .context("入力の読み込みに失敗しました")?;

        if bytes == 0 {
            println!("入力が終了したため終了します。");
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match registry.execute_input(&mut ctx, trimmed) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => return Ok(()),
            Err(error) => println!("エラー: {error:#}"),
        }
    }
}

fn print_intro(loaded: &LoadedRuleset) {
    let ruleset = &loaded.ruleset;
    println!("ポリシー・コーデックスへようこそ。");
    println!(
        "{} ブランチ / {} ポリシー / {} テンプレートを読み込みました (ソース: {})",
        ruleset.graph().branches().len(),
        ruleset.graph().policy_count(),
        ruleset.templates().len(),
        ruleset.sources().active().join(", ")
    );
    if !loaded.report.is_empty() {
        println!(
            "検証結果: エラー {} 件 / 警告 {} 件 (validate で詳細を表示)",
            loaded.report.errors().count(),
            loaded.report.warnings().count()
        );
    }
    println!("help で利用可能なコマンド一覧を表示します。");
}

fn print_help() {
    println!("利用可能なコマンド:");
    println!("  branches              ブランチとポリシーの一覧を表示");
    println!("  show <ポリシー>       前提・解放先・ユニークを表示");
    println!("  doc <名前>            ポリシーまたはブランチの説明文を表示");
    println!("  validate [ブランチ]   検証結果を表示");
    println!("  parse <ユニーク文>    ユニーク文を解析して表示");
    println!("  templates             登録済みテンプレートを表示");
    println!("  quit                  終了");
}

fn print_branches(ruleset: &Ruleset) {
    for branch in ruleset.graph().branches() {
        println!(
            "{} ({}) [{}]",
            branch.name(),
            branch.era(),
            branch.origin().unwrap_or("-")
        );
        for policy in branch.policies() {
            let position = match policy.position() {
                Some(position) => format!("{:>2},{:<2}", position.row, position.column),
                None => " 完了".to_string(),
            };
            println!("  {position} {}", policy.name());
        }
    }
}

fn print_policy(ruleset: &Ruleset, policy: &Policy) {
    let graph = ruleset.graph();
    println!("-- {} --", policy.name());
    println!("ブランチ: {}", policy.branch());
    if let Some(position) = policy.position() {
        println!("位置: 行 {} / 列 {}", position.row, position.column);
    }
    let required = graph
        .effective_requirements(policy.name())
        .unwrap_or_default();
    println!(
        "前提: {}",
        if required.is_empty() {
            "なし".to_string()
        } else {
            required.join(", ")
        }
    );
    let unlocks = graph.unlocks(policy.name());
    if !unlocks.is_empty() {
        println!("解放先: {}", unlocks.join(", "));
    }
    println!("ユニーク:");
    for entry in policy.uniques().entries() {
        match entry {
            UniqueEntry::Parsed(statement) => print_statement(statement, 1),
            UniqueEntry::Malformed { error, .. } => println!("  ⚠ {error}"),
        }
    }
}

fn print_statement(statement: &UniqueStatement, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{} [{}]", statement.display_text(), statement.kind());
    for (idx, parameter) in statement.parameters().iter().enumerate() {
        match statement.value(idx) {
            Some(value) => println!("{indent}  #{idx} {parameter} => {value:?}"),
            None => println!("{indent}  #{idx} {parameter}"),
        }
    }
    for conditional in statement.conditionals() {
        print_statement(conditional, depth + 1);
    }
}

fn print_doc_lines(lines: &[DocLine]) {
    for line in lines {
        if line.is_separator {
            println!("{}", "-".repeat(32));
            continue;
        }
        let indent = "  ".repeat(usize::from(line.styling.indent));
        let star = if line.styling.starred { "* " } else { "" };
        let text = if line.is_header {
            format!("== {} ==", line.text)
        } else {
            line.text.clone()
        };
        match line.link.as_deref().filter(|link| !link.is_empty()) {
            Some(link) => println!("{indent}{star}{text} -> {link}"),
            None => println!("{indent}{star}{text}"),
        }
    }
}

fn print_report(report: &ValidationReport, branch: Option<&str>) {
    let violations: Vec<_> = match branch {
        Some(name) => report.for_branch(name).collect(),
        None => report.violations().iter().collect(),
    };
    if violations.is_empty() {
        println!("問題は見つかりませんでした。");
        return;
    }
    for violation in violations {
        let label = match violation.severity() {
            Severity::Error => "E",
            Severity::Warning => "W",
        };
        println!("[{label}] {}: {violation}", violation.branch());
    }
}

fn print_templates(templates: &TemplateTable) {
    for template in templates.templates() {
        println!(
            "{:<28} {:<12} {}",
            template.kind(),
            template.target().to_string(),
            template.text()
        );
    }
}
