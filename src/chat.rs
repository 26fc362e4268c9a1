//! Interactive host-side chat loop
//!
//! Reads user input, forwards prompts to the sandboxed worker, and renders
//! the event stream as it arrives. An approval request pauses the pump for
//! a synchronous yes/no before anything sensitive runs in the sandbox.

use anyhow::Result;
use console::Style;
use dialoguer::{Confirm, Input};
use warden_core::{Config, ProtocolEvent, SandboxConfig, SessionController};

/// Start a session and run the REPL. The worker is torn down on every
/// exit path, including errors and Ctrl-C during a prompt.
pub async fn run(config: Config, local: bool) -> Result<()> {
    let cyan = Style::new().cyan().bold();
    let dim = Style::new().dim();

    println!("{}", cyan.apply_to("warden"));
    println!(
        "Model: {}  Workspace: {}",
        config.model,
        config.workspace.display()
    );
    println!(
        "{}",
        dim.apply_to("Type 'exit' to quit, 'reset' to clear history.")
    );

    let mut sandbox = SandboxConfig::from_config(&config);
    if local {
        let exe = std::env::current_exe()?;
        sandbox = sandbox.with_command(vec![
            exe.display().to_string(),
            "worker".to_string(),
            "--model".to_string(),
            config.model.clone(),
            "--backend-url".to_string(),
            config.backend_url.clone(),
            "--workspace".to_string(),
            config.workspace.display().to_string(),
        ]);
    }

    println!("{}", dim.apply_to("Starting sandbox worker..."));
    let mut session = SessionController::new(sandbox);
    session.start().await?;

    let result = chat_loop(&mut session).await;

    // Cleanup runs regardless of how the loop ended.
    if let Err(e) = session.shutdown().await {
        log::warn!("shutdown failed: {}", e);
    }
    println!("{}", dim.apply_to("Goodbye."));
    result
}

async fn chat_loop(session: &mut SessionController) -> Result<()> {
    loop {
        let input: String = Input::new().with_prompt("You").interact_text()?;
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "exit" => return Ok(()),
            "reset" => {
                session.send_reset().await?;
                if let Some(ProtocolEvent::Status { status }) = session.next_event().await {
                    if status == "reset" {
                        println!("{}", Style::new().yellow().apply_to("History cleared."));
                    }
                }
                continue;
            }
            prompt => {
                session.send_prompt(prompt).await?;
                let keep_going = tokio::select! {
                    done = pump(session) => done?,
                    _ = tokio::signal::ctrl_c() => {
                        println!("\n{}", Style::new().dim().apply_to("Interrupted."));
                        false
                    }
                };
                if !keep_going {
                    return Ok(());
                }
            }
        }
    }
}

/// Render events for one prompt until its terminal event. Returns whether
/// the session is still usable.
async fn pump(session: &mut SessionController) -> Result<bool> {
    let dim = Style::new().dim();
    let yellow = Style::new().yellow();
    let cyan = Style::new().cyan();
    let red = Style::new().red();

    loop {
        let Some(event) = session.next_event().await else {
            println!("{}", red.apply_to("Session error: worker terminated unexpectedly."));
            return Ok(false);
        };

        match event {
            ProtocolEvent::Status { status } => {
                println!("{}", dim.apply_to(format!("[{}]", status)));
            }
            ProtocolEvent::Thinking { content } => {
                println!("{}", dim.apply_to(format!("Agent thoughts:\n{}", content)));
            }
            ProtocolEvent::ToolOutput { content } => {
                println!("{}", yellow.apply_to(format!("Tool output:\n{}", content)));
            }
            ProtocolEvent::ApprovalRequest {
                request_id,
                tool_name,
                arguments,
            } => {
                println!(
                    "{}",
                    red.apply_to(format!("Approval required: {} {}", tool_name, arguments))
                );
                let approved = Confirm::new()
                    .with_prompt("Allow this tool to run?")
                    .default(false)
                    .interact()?;
                session.answer_approval(request_id, approved).await?;
                if !approved {
                    println!("{}", yellow.apply_to("Denied."));
                }
            }
            ProtocolEvent::Response { content } => {
                println!("{}", cyan.apply_to("Agent:"));
                println!("{}", content);
                return Ok(true);
            }
            ProtocolEvent::Error { message } => {
                println!("{}", red.apply_to(format!("Agent error: {}", message)));
                return Ok(true);
            }
        }
    }
}
