use std::io;
use std::time::Duration;

use collabforge_realtime::timer::TypingNotifier;
use collabforge_realtime::validation::validate_message;
use collabforge_realtime::{ClientEvent, ConnectionStatus, MessageType, RealtimeHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::render;

const HELP: &str = "/join <id>  /leave  /to <user>  /read  /online  /typing  /status  /quit";

/// Line-oriented chat front end driving one realtime session.
pub struct TerminalApp {
    handle: RealtimeHandle,
    event_receiver: mpsc::Receiver<ClientEvent>,
    typing: TypingNotifier,
    conversation: Option<String>,
    recipient: Option<String>,
    joined_initial: bool,
}

impl TerminalApp {
    pub fn new(
        handle: RealtimeHandle,
        event_receiver: mpsc::Receiver<ClientEvent>,
        typing_debounce: Duration,
        conversation: Option<String>,
        recipient: Option<String>,
    ) -> Self {
        Self {
            typing: TypingNotifier::new(handle.clone(), typing_debounce),
            handle,
            event_receiver,
            conversation,
            recipient,
            joined_initial: false,
        }
    }

    pub async fn run(mut self) -> io::Result<()> {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                event = self.event_receiver.recv() => match event {
                    Some(event) => self.handle_network_event(event).await,
                    None => {
                        println!("Session ended ({})", self.handle.status());
                        break;
                    }
                },
                line = lines.next_line() => match line? {
                    Some(line) => {
                        if !self.handle_input(line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.typing.finish();
        self.handle.disconnect().await;
        Ok(())
    }

    async fn handle_network_event(&mut self, event: ClientEvent) {
        if event == ClientEvent::StatusChanged(ConnectionStatus::Connected) && !self.joined_initial {
            self.joined_initial = true;
            if let Some(conversation) = &self.conversation {
                self.handle.join_conversation(conversation.clone()).await;
            }
        }
        if let Some(line) = render::event_line(&event) {
            println!("{line}");
        }
    }

    /// Returns `false` once the user asked to quit.
    async fn handle_input(&mut self, input: &str) -> bool {
        let (command, argument) = match input.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (input, ""),
        };

        match command {
            "" => {}
            "/quit" => return false,
            "/join" if !argument.is_empty() => {
                if let Some(previous) = self.conversation.replace(argument.to_string()) {
                    self.handle.leave_conversation(previous).await;
                }
                self.handle.join_conversation(argument).await;
            }
            "/leave" => {
                if let Some(previous) = self.conversation.take() {
                    self.typing.finish();
                    self.handle.leave_conversation(previous).await;
                }
            }
            "/to" if !argument.is_empty() => self.recipient = Some(argument.to_string()),
            "/read" => match &self.conversation {
                Some(conversation) => self.handle.mark_messages_read(conversation.clone()).await,
                None => println!("Join a conversation first"),
            },
            "/online" => {
                if self.handle.is_connected() {
                    self.handle.request_online_users().await;
                } else {
                    println!("{}", render::online_list(&self.handle.online_users()));
                }
            }
            "/typing" => match &self.conversation {
                Some(conversation) => {
                    let conversation = conversation.clone();
                    self.typing.keystroke(&conversation).await;
                }
                None => println!("Join a conversation first"),
            },
            "/status" => println!("* {}", self.handle.status()),
            _ if command.starts_with('/') => println!("{HELP}"),
            _ => self.send_text(input).await,
        }
        true
    }

    async fn send_text(&mut self, text: &str) {
        if let Err(err) = validate_message(text) {
            println!("! {err}");
            return;
        }
        let Some(recipient) = self.recipient.clone() else {
            println!("Pick a recipient with /to <user> first");
            return;
        };
        if !self.handle.is_connected() {
            println!("! not connected; message not sent");
            return;
        }

        self.typing.finish();
        self.handle
            .send_message(recipient, text, MessageType::Text)
            .await;
    }
}
