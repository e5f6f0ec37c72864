mod sequence;
