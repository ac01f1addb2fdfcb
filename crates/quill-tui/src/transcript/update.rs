//! Maps agent events onto transcript cells and the agent state machine.

use quill_core::core::events::AgentEvent;
use quill_core::core::interrupt;
use serde_json::json;

use super::{HistoryCell, TranscriptState};
use crate::state::AgentState;

/// Applies one agent event to the transcript.
///
/// Events that touch state outside the transcript (document updates, the
/// message history) are handled by the caller. No event ends the turn; the
/// turn is over when its channel closes (`finish_turn`).
pub fn handle_agent_event(
    transcript: &mut TranscriptState,
    agent_state: &mut AgentState,
    event: &AgentEvent,
) {
    match event {
        AgentEvent::AssistantDelta { text } => handle_assistant_delta(transcript, agent_state, text),
        AgentEvent::AssistantCompleted { text } => {
            apply_pending_delta(transcript, agent_state);
            if let AgentState::Streaming { cell_id, .. } = agent_state
                && let Some(cell) = transcript.cell_mut(*cell_id)
            {
                cell.finalize_assistant(Some(text));
            }
        }
        AgentEvent::ToolRequested { id, name } => {
            apply_pending_delta(transcript, agent_state);
            let cell = HistoryCell::tool_running(id, name, json!({}));
            let cell_id = cell.id();
            transcript.push_cell(cell);
            agent_state.start_streaming(cell_id);
        }
        AgentEvent::ToolInputDelta { id, delta, .. } => {
            transcript.set_tool_input_delta_for(id, delta.clone());
        }
        AgentEvent::ToolInputCompleted { id, input, .. } => {
            transcript.set_tool_input_for(id, input.clone());
        }
        AgentEvent::ToolCompleted { id, result } => {
            transcript.set_tool_result_for(id, result.clone());
        }
        AgentEvent::Error { message, .. } => {
            apply_pending_delta(transcript, agent_state);
            transcript.mark_errored();
            transcript.push_cell(HistoryCell::system(format!("Error: {message}")));
        }
        AgentEvent::Interrupted { .. } => {
            apply_pending_delta(transcript, agent_state);
            transcript.mark_interrupted();
            interrupt::reset();
        }
        AgentEvent::TurnCompleted { .. } => finalize_streaming_cell(transcript, agent_state),
        AgentEvent::TurnStarted
        | AgentEvent::ToolStarted { .. }
        | AgentEvent::DocumentUpdated { .. }
        | AgentEvent::UsageUpdate { .. } => {}
    }
}

fn handle_assistant_delta(
    transcript: &mut TranscriptState,
    agent_state: &mut AgentState,
    text: &str,
) {
    let needs_new_cell = match agent_state {
        AgentState::Idle => return,
        AgentState::Waiting { .. } => true,
        AgentState::Streaming { cell_id, .. } => transcript
            .cells()
            .iter()
            .find(|c| c.id() == *cell_id)
            .is_none_or(|c| {
                !matches!(
                    c,
                    HistoryCell::Assistant {
                        is_streaming: true,
                        ..
                    }
                )
            }),
    };

    if needs_new_cell {
        let cell = HistoryCell::assistant_streaming("");
        let cell_id = cell.id();
        transcript.push_cell(cell);
        agent_state.start_streaming(cell_id);
    }
    if let AgentState::Streaming { pending_delta, .. } = agent_state {
        pending_delta.push_str(text);
    }
}

/// Closes out a turn whose event channel has closed.
pub fn finish_turn(transcript: &mut TranscriptState, agent_state: &mut AgentState) {
    finalize_streaming_cell(transcript, agent_state);
    *agent_state = AgentState::Idle;
}

fn finalize_streaming_cell(transcript: &mut TranscriptState, agent_state: &mut AgentState) {
    apply_pending_delta(transcript, agent_state);
    if let AgentState::Streaming { cell_id, .. } = agent_state
        && let Some(cell) = transcript.cell_mut(*cell_id)
    {
        cell.finalize_assistant(None);
    }
}

/// Flushes buffered assistant text into the streaming cell.
///
/// Deltas are coalesced and applied once per tick.
pub fn apply_pending_delta(transcript: &mut TranscriptState, agent_state: &mut AgentState) {
    if let AgentState::Streaming {
        cell_id,
        pending_delta,
        ..
    } = agent_state
        && !pending_delta.is_empty()
    {
        let delta = std::mem::take(pending_delta);
        if let Some(cell) = transcript.cell_mut(*cell_id) {
            cell.append_assistant_delta(&delta);
        }
    }
}
