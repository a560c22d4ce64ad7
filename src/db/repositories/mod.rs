mod watches;
