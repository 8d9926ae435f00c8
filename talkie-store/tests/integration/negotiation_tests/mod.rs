mod test_candidate_replay;
