mod test_caller_negotiates_once;
mod test_leave_teardown;
mod test_mic_denied;
mod test_talk_gate;
