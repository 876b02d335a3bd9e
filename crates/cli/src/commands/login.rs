//! Interactive OTP login.
//!
//! # Usage
//!
//! ```bash
//! flow-cli login --mobile 9876543210 --channel sms
//! ```
//!
//! At the OTP prompt, `r` requests a new code once the cooldown has passed
//! and `b` goes back to change the mobile number.

use std::io::Write;

use flow_hydration_client::{CustomerAuth, FlowEvent, FlowStep};
use flow_hydration_core::OtpChannel;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::TryRecvError};

use super::CliError;

/// Line-based prompts on stdin.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    #[allow(clippy::print_stdout)]
    async fn ask(&mut self, question: &str) -> Result<String, CliError> {
        print!("{question}");
        std::io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(CliError::InputClosed),
        }
    }
}

/// Run the login flow until the customer is logged in.
///
/// # Errors
///
/// Returns error if stdin closes, or if `mobile` was given on the command
/// line and sending the OTP to it fails.
#[allow(clippy::print_stdout)]
pub async fn run(
    auth: &CustomerAuth,
    mobile: Option<String>,
    channel: OtpChannel,
) -> Result<(), CliError> {
    if auth.init().await {
        let name = auth
            .customer()
            .and_then(|c| c.display_name().map(str::to_string))
            .unwrap_or_else(|| "customer".to_string());
        println!("Already logged in as {name}. Run `flow-cli logout` first to switch accounts.");
        return Ok(());
    }

    let flow = auth.login_flow();
    let mut events = flow.subscribe();
    let mut prompt = Prompt::new();
    let mut preset = mobile;

    loop {
        let done = match flow.step() {
            FlowStep::MobileEntry => {
                let from_args = preset.is_some();
                let input = match preset.take() {
                    Some(mobile) => mobile,
                    None => prompt.ask("Mobile number: ").await?,
                };
                let result = flow.submit_mobile(&input, channel).await;
                show_events(&mut events);
                match result {
                    Ok(_) => println!("OTP sent via {channel}."),
                    Err(e) if from_args => return Err(e.into()),
                    Err(_) => {}
                }
                false
            }
            FlowStep::OtpEntry => {
                let input = prompt.ask("OTP (r = resend, b = back): ").await?;
                let finished = match input.as_str() {
                    "r" | "R" => {
                        if flow.resend_otp().await.is_ok() {
                            println!("A new OTP has been sent.");
                        }
                        false
                    }
                    "b" | "B" => {
                        flow.back()?;
                        false
                    }
                    code => {
                        flow.paste_otp(code);
                        matches!(flow.submit_otp().await, Ok(FlowStep::Done))
                    }
                };
                show_events(&mut events);
                finished
            }
            FlowStep::NameEntry => {
                let name = prompt.ask("Your name: ").await?;
                let finished = flow.submit_name(&name).await.is_ok();
                show_events(&mut events);
                finished
            }
            FlowStep::Done => true,
        };

        if done {
            return Ok(());
        }
    }
}

/// Print pending events.
#[allow(clippy::print_stdout, clippy::print_stderr)]
fn show_events(events: &mut broadcast::Receiver<FlowEvent>) {
    loop {
        let event = match events.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        };
        match event {
            FlowEvent::Error(message) => eprintln!("{message}"),
            FlowEvent::DevOtp(otp) => println!("(development) OTP: {otp}"),
            FlowEvent::LoggedIn { greeting, .. } => println!("{greeting}"),
            FlowEvent::StepChanged(_) | FlowEvent::CooldownTick(_) | FlowEvent::ResendAvailable => {}
        }
    }
}
