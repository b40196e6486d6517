//! Terminal onboarding: walks through profile, goals and review against a
//! running API server, then lets the new user record transactions, list
//! them by month and chat with the assistant.

use chrono::{NaiveDate, Utc};
use finance_coach::{
    client::{FinanceClient, TransactionDraft},
    config::AppConfig,
    money::{format_cents_to_brl, parse_currency_to_cents},
    onboarding::{GoalKey, OnboardingFlow, OnboardingStep, UiTerm},
    TransactionType,
};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, label: &str) -> io::Result<Option<String>> {
    print!("{}: ", label);
    io::stdout().flush()?;
    lines.next().transpose().map(|line| line.map(|l| l.trim().to_string()))
}

fn ask(lines: &mut impl Iterator<Item = io::Result<String>>, label: &str) -> io::Result<String> {
    Ok(prompt(lines, label)?.unwrap_or_default())
}

fn yes(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("s")
}

/// Read one transaction from the entry form; `None` when the input is unusable.
fn read_draft(lines: &mut impl Iterator<Item = io::Result<String>>) -> io::Result<Option<TransactionDraft>> {
    let kind = match ask(lines, "Tipo (entrada/saida)")?.to_lowercase().as_str() {
        "entrada" | "e" => TransactionType::Income,
        "saida" | "saída" | "s" => TransactionType::Expense,
        other => {
            println!("Tipo desconhecido: '{}'", other);
            return Ok(None);
        }
    };

    let Some(value) = parse_currency_to_cents(Some(&ask(lines, "Valor (R$)")?)) else {
        println!("Valor inválido.");
        return Ok(None);
    };

    let raw_date = ask(lines, "Data (AAAA-MM-DD, vazio para hoje)")?;
    let date = if raw_date.is_empty() {
        Utc::now().date_naive()
    } else {
        match NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                println!("Data inválida.");
                return Ok(None);
            }
        }
    };

    let mut draft = match kind {
        TransactionType::Income => TransactionDraft::income(value, date),
        TransactionType::Expense => TransactionDraft::expense(value, date),
    };

    let description = ask(lines, "Descrição (opcional)")?;
    draft.description = Some(description).filter(|d| !d.is_empty());

    if kind == TransactionType::Expense {
        draft.optional = yes(&ask(lines, "Gasto opcional? (s/n)")?);
    }

    draft.in_cash = !yes(&ask(lines, "Parcelado? (s/n)")?);
    if !draft.in_cash {
        match ask(lines, "Número de parcelas")?.parse::<i32>() {
            Ok(months) if months > 0 => draft.months = Some(months),
            _ => {
                println!("Número de parcelas inválido.");
                return Ok(None);
            }
        }
    }

    Ok(Some(draft))
}

async fn enter_transaction(
    client: &FinanceClient,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<()> {
    let Some(draft) = read_draft(lines)? else {
        return Ok(());
    };

    match client.create_transaction(&draft).await {
        Ok(created) => println!(
            "Transação registrada: {} em {}",
            format_cents_to_brl(Some(created.value)).unwrap_or_default(),
            created.date.format("%d/%m/%Y")
        ),
        Err(e) => println!("Erro: {}", e),
    }
    Ok(())
}

async fn list_month(
    client: &FinanceClient,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<()> {
    let month = ask(lines, "Mês (AAAA-MM, vazio para todos)")?;
    let filter = Some(month.as_str()).filter(|m| !m.is_empty());

    match client.list_transactions(filter).await {
        Ok(transactions) if transactions.is_empty() => println!("Nenhuma transação."),
        Ok(transactions) => {
            for tx in transactions {
                let sign = if tx.kind == TransactionType::Income { "+" } else { "-" };
                let installments = tx.months.map(|m| format!(" em {}x", m)).unwrap_or_default();
                println!(
                    "  {} {}{}{} {}",
                    tx.date.format("%d/%m/%Y"),
                    sign,
                    format_cents_to_brl(Some(tx.value)).unwrap_or_default(),
                    installments,
                    tx.description.unwrap_or_default()
                );
            }
        }
        Err(e) => println!("Erro: {}", e),
    }
    Ok(())
}

async fn chat(
    client: &FinanceClient,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<()> {
    println!("\nConverse com o assistente (linha vazia para voltar).");
    while let Some(message) = prompt(lines, "Você")? {
        if message.is_empty() {
            break;
        }
        match client.chat(&message).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(e) => println!("Erro: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AppConfig::from_env()?;
    let mut client = FinanceClient::new(config.api_base_url.clone())?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut flow = OnboardingFlow::new();

    loop {
        println!("\n== Passo {} de 3 ({}%) ==", flow.step().number(), flow.step().progress_percent());

        match flow.step() {
            OnboardingStep::Profile => {
                flow.profile.name = ask(&mut lines, "Nome")?;
                flow.profile.email = ask(&mut lines, "Email")?;
                flow.profile.age = ask(&mut lines, "Idade")?;
                flow.profile.income = ask(&mut lines, "Renda mensal (R$)")?;
                flow.profile.money_saved = ask(&mut lines, "Dinheiro guardado (R$, opcional)")?;
            }
            OnboardingStep::Goals => {
                for (index, key) in GoalKey::CATALOG.iter().enumerate() {
                    let mark = if flow.is_selected(*key) { "x" } else { " " };
                    println!("  [{}] {} {}", mark, index + 1, key.display_name());
                }
                let picks = ask(&mut lines, "Metas (números separados por vírgula)")?;
                for pick in picks.split(',').filter_map(|p| p.trim().parse::<usize>().ok()) {
                    if let Some(key) = pick.checked_sub(1).and_then(|i| GoalKey::CATALOG.get(i)) {
                        flow.toggle_goal(*key);
                    }
                }

                let selected: Vec<GoalKey> = flow.selected_goals().iter().map(|g| g.key).collect();
                for key in selected {
                    println!("-- {}", key.display_name());
                    let label = if key == GoalKey::Other {
                        Some(ask(&mut lines, "  Nome da meta")?)
                    } else {
                        None
                    };
                    let value = ask(&mut lines, "  Valor alvo (R$, opcional)")?;
                    let term = ask(&mut lines, "  Prazo (curto/medio/longo)")?;

                    if let Some(goal) = flow.goal_mut(key) {
                        if label.is_some() {
                            goal.custom_label = label;
                        }
                        goal.value = value;
                        goal.term = UiTerm::parse(&term);
                    }
                }
            }
            OnboardingStep::Review => {
                let request = flow.build_request()?;
                println!("Nome: {}", request.name);
                println!("Email: {}", request.email);
                println!("Renda: {}", format_cents_to_brl(Some(request.income)).unwrap_or_default());
                println!("Guardado: {}", format_cents_to_brl(Some(request.money_saved)).unwrap_or_default());
                for goal in &request.goals {
                    let value = format_cents_to_brl(goal.value).unwrap_or_else(|| "-".to_string());
                    let primary = if goal.primary { " (principal)" } else { "" };
                    println!("  - {}{}: {} [{}]", goal.goal, primary, value, goal.term);
                }

                let answer = ask(&mut lines, "Confirmar? (s/n)")?;
                if yes(&answer) {
                    let user_id = client.submit_onboarding(&flow).await?;
                    println!("Cadastro concluído ({}).", user_id);
                    break;
                }
                flow.back();
                continue;
            }
        }

        if let Err(e) = flow.next() {
            println!("{}", e);
        }
    }

    loop {
        println!("\n1) Nova transação  2) Transações do mês  3) Assistente  0) Sair");
        let Some(choice) = prompt(&mut lines, "Opção")? else {
            break;
        };
        match choice.as_str() {
            "1" => enter_transaction(&client, &mut lines).await?,
            "2" => list_month(&client, &mut lines).await?,
            "3" => chat(&client, &mut lines).await?,
            "0" | "" => break,
            other => println!("Opção desconhecida: '{}'", other),
        }
    }

    Ok(())
}
